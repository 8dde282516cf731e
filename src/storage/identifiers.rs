use anyhow::{Result, Context};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::cli::config::InputSettings;

/// Reads identifier tokens from a line-delimited file
pub struct IdentifierSource {
    /// Tokens must match this when set
    pattern: Option<Regex>,

    /// Keep only the first occurrence of each token
    dedupe: bool,
}

impl IdentifierSource {
    pub fn new(settings: &InputSettings) -> Result<Self> {
        let pattern = if settings.validate {
            Some(Regex::new(&settings.pattern)
                .context(format!("Invalid identifier pattern: {}", settings.pattern))?)
        } else {
            None
        };

        Ok(Self {
            pattern,
            dedupe: settings.dedupe,
        })
    }

    /// Read and clean the identifiers in `path`
    pub async fn read(&self, path: &Path) -> Result<Vec<String>> {
        let contents = tokio::fs::read_to_string(path).await
            .context(format!("Failed to read identifier file: {}", path.display()))?;

        let identifiers = self.parse(&contents);
        debug!("Read {} identifier(s) from {}", identifiers.len(), path.display());

        Ok(identifiers)
    }

    /// Trimmed, non-empty tokens, filtered and deduplicated per settings
    pub fn parse(&self, contents: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut identifiers = Vec::new();

        for token in contents.lines().map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(token) {
                    warn!("Skipping invalid identifier: {}", token);
                    continue;
                }
            }

            if self.dedupe && !seen.insert(token.to_string()) {
                debug!("Skipping duplicate identifier: {}", token);
                continue;
            }

            identifiers.push(token.to_string());
        }

        identifiers
    }
}
