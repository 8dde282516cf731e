use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, trace};

use crate::extractor::document::{non_empty, Document};

/// One way of reading a field out of a document
#[async_trait]
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Raw value located by this strategy, if any
    async fn attempt(&self, doc: &dyn Document) -> Result<Option<String>>;
}

/// Text content of the first element matching a selector
#[derive(Debug, Clone)]
pub struct TextOf(pub String);

/// Attribute of the first element matching a selector
#[derive(Debug, Clone)]
pub struct AttrOf {
    pub selector: String,
    pub attribute: String,
}

#[async_trait]
impl Strategy for TextOf {
    async fn attempt(&self, doc: &dyn Document) -> Result<Option<String>> {
        doc.text(&self.0).await
    }
}

#[async_trait]
impl Strategy for AttrOf {
    async fn attempt(&self, doc: &dyn Document) -> Result<Option<String>> {
        doc.attr(&self.selector, &self.attribute).await
    }
}

/// Ordered fallback strategies for a single field
pub struct SelectorChain {
    field: &'static str,
    strategies: Vec<Box<dyn Strategy>>,
}

impl fmt::Debug for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorChain")
            .field("field", &self.field)
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl SelectorChain {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a text-content strategy
    pub fn text(self, selector: &str) -> Self {
        self.with(TextOf(selector.to_string()))
    }

    /// Append an attribute strategy
    pub fn attr(self, selector: &str, attribute: &str) -> Self {
        self.with(AttrOf {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        })
    }

    /// Append any strategy
    pub fn with(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// First non-empty normalized value, trying strategies in order.
    ///
    /// A failing strategy only counts as a miss.
    pub async fn resolve(&self, doc: &dyn Document) -> Option<String> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.attempt(doc).await {
                Ok(Some(raw)) => {
                    if let Some(value) = non_empty(&raw) {
                        trace!("{}: strategy {} matched", self.field, index);
                        return Some(value);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("{}: strategy {:?} failed: {}", self.field, strategy, e);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::snapshot::SnapshotDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Strategy that records how often it ran and returns a fixed value
    #[derive(Debug)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        value: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Strategy for Counting {
        async fn attempt(&self, _doc: &dyn Document) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("stale element reference");
            }
            Ok(self.value.map(str::to_string))
        }
    }

    fn counting(value: Option<&'static str>, fail: bool) -> (Counting, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                calls: calls.clone(),
                value,
                fail,
            },
            calls,
        )
    }

    #[tokio::test]
    async fn test_first_match_stops_the_chain() {
        let doc = SnapshotDocument::new("<html></html>");
        let (first, first_calls) = counting(Some("Widget"), false);
        let (second, second_calls) = counting(Some("Other"), false);

        let chain = SelectorChain::new("title").with(first).with(second);

        assert_eq!(chain.resolve(&doc).await.as_deref(), Some("Widget"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_and_blank_values_fall_through() {
        let doc = SnapshotDocument::new("<html></html>");
        let (broken, _) = counting(None, true);
        let (blank, _) = counting(Some(" \u{200E} "), false);
        let (good, good_calls) = counting(Some(" ₹ 499 "), false);

        let chain = SelectorChain::new("price").with(broken).with(blank).with(good);

        assert_eq!(chain.resolve(&doc).await.as_deref(), Some("₹ 499"));
        assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_none() {
        let doc = SnapshotDocument::new("<p id='a'>   </p>");
        let chain = SelectorChain::new("rating").text("#a").text("#b").attr("#c", "title");

        assert_eq!(chain.resolve(&doc).await, None);
    }

    #[tokio::test]
    async fn test_resolution_is_repeatable() {
        let doc = SnapshotDocument::new("<div id='availability'> <span>In stock</span> </div>");
        let chain = SelectorChain::new("availability").text("#availability");

        let first = chain.resolve(&doc).await;
        let second = chain.resolve(&doc).await;
        assert_eq!(first.as_deref(), Some("In stock"));
        assert_eq!(first, second);
    }
}
