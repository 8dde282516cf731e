pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract product records for every identifier in the input file
    Scrape {
        /// Identifier file, one token per line
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target domain, e.g. amazon.co.uk
        #[arg(short, long)]
        domain: Option<String>,

        /// Maximum number of pages at once
        #[arg(short = 'n', long)]
        concurrency: Option<usize>,

        /// JSON output path
        #[arg(long)]
        json: Option<PathBuf>,

        /// CSV output path
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run the field extractor over a saved HTML page
    Parse {
        /// Saved page
        #[arg(required = true)]
        file: PathBuf,

        /// Identifier to report the record under
        #[arg(short, long, default_value = "UNKNOWN")]
        asin: String,

        /// Domain used for the canonical URL
        #[arg(short, long, default_value = "amazon.in")]
        domain: String,
    },

    /// Show the active configuration
    Config {
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the default configuration to the default location
        #[arg(long)]
        init: bool,
    },
}

/// Scrape options collected from the command line
pub struct ScrapeArgs {
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub domain: Option<String>,
    pub concurrency: Option<usize>,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape { input, config, domain, concurrency, json, csv } => {
            info!("Starting scrape run");
            commands::scrape(ScrapeArgs { input, config, domain, concurrency, json, csv }).await
        },
        Commands::Parse { file, asin, domain } => {
            info!("Parsing saved page {}", file.display());
            commands::parse(file, asin, domain).await
        },
        Commands::Config { config, init } => {
            if init {
                commands::init_config().await
            } else {
                commands::show_config(config).await
            }
        },
    }
}
