use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Cells of one row inside a key/value details region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCells {
    /// Text of the row's key sub-element, if present
    pub key: Option<String>,

    /// Text of the row's value sub-element, if present
    pub value: Option<String>,

    /// Full text content of the row
    pub text: String,
}

/// Read access to a loaded document.
///
/// Selectors are CSS. Texts are raw `textContent`; normalization is the
/// extractor's job.
#[async_trait]
pub trait Document: Send + Sync {
    /// Text content of the first element matching `selector`
    async fn text(&self, selector: &str) -> Result<Option<String>>;

    /// Attribute `name` of the first element matching `selector`
    async fn attr(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Text content of every element matching `selector`, in document order
    async fn all_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Whether any element matches `selector`
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// For each element matching `row`, the first `key` and `value` descendants
    async fn rows(&self, row: &str, key: &str, value: &str) -> Result<Vec<RowCells>>;

    /// Click the first element matching `selector`; false when nothing matched
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Scroll down by one viewport
    async fn scroll_viewport(&self) -> Result<()> {
        Ok(())
    }

    /// Poll until one of `selectors` matches, returning its index.
    ///
    /// Returns `None` once `budget` is spent without a match.
    async fn wait_for_any(
        &self,
        selectors: &[&str],
        budget: Duration,
        poll: Duration,
    ) -> Result<Option<usize>> {
        let deadline = Instant::now() + budget;
        loop {
            for (index, selector) in selectors.iter().enumerate() {
                if self.exists(selector).await? {
                    return Ok(Some(index));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }
}

fn is_mark(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
    )
}

/// Strip bidirectional/control marks and collapse whitespace
pub fn normalize_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !is_mark(*c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a details-table label or value, also dropping trailing colons
pub fn normalize_label(raw: &str) -> String {
    let text = normalize_text(raw);
    text.trim_end_matches(|c: char| c == ':' || c.is_whitespace())
        .to_string()
}

/// Normalized value, or `None` when nothing is left
pub fn non_empty(raw: &str) -> Option<String> {
    let text = normalize_text(raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
