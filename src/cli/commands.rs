use anyhow::{Result, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::{IdentityPool, RandomPacing, SnapshotDocument, WebDriverEngine};
use crate::cli::config::{ExtractorSettings, HarvesterConfig};
use crate::cli::ScrapeArgs;
use crate::crawler::task::canonical_url;
use crate::crawler::ProductScraper;
use crate::extractor::ProductExtractor;
use crate::storage::{sinks, IdentifierSource};

/// Run a full extraction over the identifier file
pub async fn scrape(args: ScrapeArgs) -> Result<()> {
    let mut config = HarvesterConfig::load(args.config.as_deref())?;

    // Override configuration with command line parameters if provided
    if let Some(input) = args.input {
        config.input.path = input;
    }
    if let Some(domain) = args.domain {
        config.scraper.domain = domain;
    }
    if let Some(concurrency) = args.concurrency {
        config.scraper.concurrency = concurrency;
    }
    if let Some(json) = args.json {
        config.output.json_path = json;
    }
    if let Some(csv) = args.csv {
        config.output.csv_path = csv;
    }
    config.validate()?;

    let source = IdentifierSource::new(&config.input)?;
    let identifiers = source.read(&config.input.path).await?;
    if identifiers.is_empty() {
        warn!("No valid identifiers found in {}", config.input.path.display());
        return Ok(());
    }
    info!("Found {} identifier(s)", identifiers.len());

    let engine = WebDriverEngine::start(config.browser.clone()).await?;
    let scraper = ProductScraper::new(
        config.orchestrator(),
        Arc::new(engine),
        Arc::new(RandomPacing::new(config.pacing.clone())),
        IdentityPool::from_settings(&config.browser),
        ProductExtractor::new(&config.extractor),
    );

    let report = scraper.run(identifiers).await;

    for sink in sinks(&config.output) {
        let written = sink.write(&report.results).await
            .context(format!("Failed to write {} output", sink.name()))?;
        info!("Saved {} results to {}", written, sink.path().display());
    }

    let summary = &report.summary;
    info!(
        "Run finished: {} succeeded, {} failed, {} attempt(s) in {} ms",
        summary.succeeded, summary.failed, summary.attempts, summary.elapsed_ms
    );
    for (kind, count) in &summary.attempt_failures {
        info!("  {} failed attempt(s): {}", kind, count);
    }

    Ok(())
}

/// Extract a record from a saved page and print it as JSON
pub async fn parse(file: PathBuf, asin: String, domain: String) -> Result<()> {
    let html = tokio::fs::read_to_string(&file).await
        .context(format!("Failed to read page: {}", file.display()))?;

    let document = SnapshotDocument::new(html);
    let extractor = ProductExtractor::new(&ExtractorSettings {
        list_wait_ms: 0,
        poll_interval_ms: 1,
    });

    let url = canonical_url(&domain, &asin);
    let record = extractor.extract(&document, &asin, &url).await;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

/// Show the active configuration
pub async fn show_config(path: Option<PathBuf>) -> Result<()> {
    let config = HarvesterConfig::load(path.as_deref())?;
    println!("Current configuration:");
    println!("{}", serde_yaml::to_string(&config)?);

    Ok(())
}

/// Write the default configuration file
pub async fn init_config() -> Result<()> {
    let path = HarvesterConfig::default_path();
    if path.exists() {
        warn!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    HarvesterConfig::default().save_to_file(&path)?;
    println!("Created default configuration: {}", path.display());

    Ok(())
}
