use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use tracing::{info, debug, error};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HarvesterConfig {
    pub scraper: ScraperSettings,
    pub browser: BrowserSettings,
    pub pacing: PacingSettings,
    pub extractor: ExtractorSettings,
    pub input: InputSettings,
    pub output: OutputSettings,
}

/// Orchestrator settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScraperSettings {
    pub domain: String,
    pub concurrency: usize,
    pub navigation_timeout_ms: u64,
    pub max_attempts: u32,
    pub consent_pause_ms: u64,  // Pause after clicking a consent control
}

/// Browser session settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub viewport: Viewport,
    pub accept_language: String,
    pub user_agents: Vec<String>,
}

/// Browser viewport settings
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Randomized delay ranges, in milliseconds (inclusive)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PacingSettings {
    pub settle: (u64, u64),
    pub release: (u64, u64),
    pub backoff: (u64, u64),
    pub seed: Option<u64>,
}

/// Field extractor settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractorSettings {
    pub list_wait_ms: u64,
    pub poll_interval_ms: u64,
}

/// Identifier source settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputSettings {
    pub path: PathBuf,
    pub validate: bool,
    pub pattern: String,
    pub dedupe: bool,
}

/// Output artifact settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputSettings {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

/// The subset of settings the orchestrator core is constructed with
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub domain: String,
    pub concurrency: usize,
    pub navigation_timeout: Duration,
    pub max_attempts: u32,
    pub consent_pause: Duration,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperSettings {
                domain: "amazon.in".to_string(),
                concurrency: 3,
                navigation_timeout_ms: 30_000,
                max_attempts: 2,
                consent_pause_ms: 500,
            },
            browser: BrowserSettings {
                webdriver_url: "http://localhost:4444".to_string(),
                headless: true,
                viewport: Viewport {
                    width: 1200,
                    height: 800,
                },
                accept_language: "en-US,en;q=0.9".to_string(),
                user_agents: vec![
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Safari/605.1.15".to_string(),
                    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                ],
            },
            pacing: PacingSettings {
                settle: (500, 2000),
                release: (300, 700),
                backoff: (1500, 3500),
                seed: None,
            },
            extractor: ExtractorSettings {
                list_wait_ms: 3000,
                poll_interval_ms: 250,
            },
            input: InputSettings {
                path: PathBuf::from("asins.txt"),
                validate: true,
                pattern: "^[A-Za-z0-9]{10}$".to_string(),
                dedupe: true,
            },
            output: OutputSettings {
                json_path: PathBuf::from("results.json"),
                csv_path: PathBuf::from("results.csv"),
            },
        }
    }
}

impl HarvesterConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "product-harvester", "product-harvester") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        }
    }

    /// Path of the default configuration file
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("default.yaml")
    }

    /// Load the configuration from `path`, or the default location when absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the default configuration, creating it on first use
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_path();

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            if let Err(e) = config.save_to_file(&config_path) {
                // Running with defaults is still fine when the config dir is read-only
                error!("Failed to save default configuration: {}", e);
            }
            Ok(config)
        }
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scraper.domain.trim().is_empty() {
            anyhow::bail!("scraper.domain must not be empty");
        }
        if self.scraper.concurrency == 0 {
            anyhow::bail!("scraper.concurrency must be at least 1");
        }
        if self.scraper.max_attempts == 0 {
            anyhow::bail!("scraper.max_attempts must be at least 1");
        }
        if self.scraper.navigation_timeout_ms == 0 {
            anyhow::bail!("scraper.navigation_timeout_ms must be greater than 0");
        }
        if self.browser.user_agents.is_empty() {
            anyhow::bail!("browser.user_agents must contain at least one entry");
        }
        for (name, (min, max)) in [
            ("settle", self.pacing.settle),
            ("release", self.pacing.release),
            ("backoff", self.pacing.backoff),
        ] {
            if min > max {
                anyhow::bail!("pacing.{} range is inverted: {} > {}", name, min, max);
            }
        }
        Ok(())
    }

    /// Settings handed to the orchestrator core
    pub fn orchestrator(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            domain: self.scraper.domain.clone(),
            concurrency: self.scraper.concurrency,
            navigation_timeout: Duration::from_millis(self.scraper.navigation_timeout_ms),
            max_attempts: self.scraper.max_attempts,
            consent_pause: Duration::from_millis(self.scraper.consent_pause_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarvesterConfig::default();
        assert!(config.validate().is_ok());

        let settings = config.orchestrator();
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.max_attempts, 2);
        assert_eq!(settings.navigation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_yaml_round_trip_keeps_ranges() {
        let config = HarvesterConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: HarvesterConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.pacing.backoff, (1500, 3500));
        assert_eq!(parsed.browser.viewport, Viewport { width: 1200, height: 800 });
        assert_eq!(parsed.browser.user_agents.len(), 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HarvesterConfig::default();
        config.scraper.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = HarvesterConfig::default();
        config.pacing.release = (700, 300);
        assert!(config.validate().is_err());

        let mut config = HarvesterConfig::default();
        config.browser.user_agents.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_navigation_timeout() {
        let mut config = HarvesterConfig::default();
        config.scraper.navigation_timeout_ms = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("navigation_timeout_ms"));
    }
}
