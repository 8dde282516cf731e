use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::extractor::document::{Document, RowCells};

/// A static HTML page, queried with `scraper`.
///
/// The markup is re-parsed per query so the document stays `Send + Sync`.
#[derive(Debug, Clone)]
pub struct SnapshotDocument {
    source: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

impl SnapshotDocument {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    fn with_html<T>(&self, f: impl FnOnce(&Html) -> Result<T>) -> Result<T> {
        let html = Html::parse_document(&self.source);
        f(&html)
    }
}

#[async_trait]
impl Document for SnapshotDocument {
    async fn text(&self, css: &str) -> Result<Option<String>> {
        let sel = selector(css)?;
        self.with_html(|html| Ok(html.select(&sel).next().map(text_content)))
    }

    async fn attr(&self, css: &str, name: &str) -> Result<Option<String>> {
        let sel = selector(css)?;
        self.with_html(|html| {
            Ok(html
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr(name).map(str::to_string)))
        })
    }

    async fn all_texts(&self, css: &str) -> Result<Vec<String>> {
        let sel = selector(css)?;
        self.with_html(|html| Ok(html.select(&sel).map(text_content).collect()))
    }

    async fn exists(&self, css: &str) -> Result<bool> {
        let sel = selector(css)?;
        self.with_html(|html| Ok(html.select(&sel).next().is_some()))
    }

    async fn rows(&self, row: &str, key: &str, value: &str) -> Result<Vec<RowCells>> {
        let row_sel = selector(row)?;
        let key_sel = selector(key)?;
        let value_sel = selector(value)?;

        self.with_html(|html| {
            Ok(html
                .select(&row_sel)
                .map(|el| RowCells {
                    key: el.select(&key_sel).next().map(text_content),
                    value: el.select(&value_sel).next().map(text_content),
                    text: text_content(el),
                })
                .collect())
        })
    }

    async fn click(&self, css: &str) -> Result<bool> {
        // Nothing to interact with in a static page
        self.exists(css).await
    }
}
