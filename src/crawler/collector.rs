use crate::crawler::task::ExtractionResult;

/// Accumulates terminal records in completion order
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Vec<ExtractionResult>,
}

impl ResultCollector {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, result: ExtractionResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Hand over the full collection
    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut collector = ResultCollector::default();
        collector.push(ExtractionResult::empty("A", "u/A"));
        collector.push(ExtractionResult::failed("B", "u/B", "timeout"));
        collector.push(ExtractionResult::empty("C", "u/C"));

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.succeeded(), 2);
        assert_eq!(collector.failed(), 1);

        let ids: Vec<_> = collector.into_results().into_iter().map(|r| r.identifier).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }
}
