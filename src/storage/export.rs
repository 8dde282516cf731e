use anyhow::{Result, Context};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::config::OutputSettings;
use crate::crawler::task::ExtractionResult;

/// Separator between bullet points in the tabular form
pub const BULLET_SEPARATOR: &str = " | ";

/// Column headers of the tabular form, in order
pub const CSV_HEADER: [&str; 13] = [
    "ASIN", "Title", "Price", "Rating", "Reviews", "About", "Description",
    "Image", "Availability", "BSR", "URL", "Details", "Error",
];

/// Destination for the complete set of records
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Short artifact name for the summary
    fn name(&self) -> &'static str;

    /// Where the artifact is written
    fn path(&self) -> &Path;

    /// Persist all records, returning how many were written
    async fn write(&self, results: &[ExtractionResult]) -> Result<usize>;
}

/// Build the configured sinks
pub fn sinks(settings: &OutputSettings) -> Vec<Box<dyn ResultSink>> {
    vec![
        Box::new(JsonSink::new(settings.json_path.clone())),
        Box::new(CsvSink::new(settings.csv_path.clone())),
    ]
}

async fn write_file(path: &Path, contents: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    tokio::fs::write(path, contents).await
        .context(format!("Failed to write output file: {}", path.display()))
}

/// Pretty-printed JSON array, one object per identifier
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ResultSink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, results: &[ExtractionResult]) -> Result<usize> {
        let contents = serde_json::to_string_pretty(results)
            .context("Failed to serialize results as JSON")?;
        write_file(&self.path, contents).await?;

        debug!("Exported {} records to JSON file: {}", results.len(), self.path.display());
        Ok(results.len())
    }
}

/// Flat CSV with a fixed column order
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Attribute table as `key: value` pairs in key order
pub fn serialize_table(table: &BTreeMap<String, String>) -> String {
    table
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One CSV line (without terminator) for a record
pub fn csv_row(record: &ExtractionResult) -> String {
    let opt = |value: &Option<String>| value.clone().unwrap_or_default();

    let fields = [
        record.identifier.clone(),
        opt(&record.title),
        opt(&record.price),
        opt(&record.rating),
        opt(&record.review_count),
        record.bullet_points.as_ref().map(|b| b.join(BULLET_SEPARATOR)).unwrap_or_default(),
        opt(&record.product_description),
        opt(&record.image),
        opt(&record.availability),
        opt(&record.best_seller_rank),
        record.canonical_url.clone(),
        record.attribute_table.as_ref().map(serialize_table).unwrap_or_default(),
        opt(&record.error_message),
    ];

    fields.iter().map(|f| escape(f)).collect::<Vec<_>>().join(",")
}

#[async_trait]
impl ResultSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, results: &[ExtractionResult]) -> Result<usize> {
        let mut contents = CSV_HEADER.join(",");
        contents.push_str("\r\n");
        for record in results {
            contents.push_str(&csv_row(record));
            contents.push_str("\r\n");
        }
        write_file(&self.path, contents).await?;

        debug!("Exported {} records to CSV file: {}", results.len(), self.path.display());
        Ok(results.len())
    }
}
