use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::debug;

use crate::crawler::collector::ResultCollector;
use crate::crawler::task::ExtractionResult;

/// Bounded-concurrency FIFO admission of identifiers
pub struct Scheduler {
    /// Maximum number of tasks in flight
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run one task per identifier, at most `concurrency` at a time.
    ///
    /// Identifiers are admitted in input order as slots free up. Resolves once
    /// every task has produced its record.
    pub async fn run<F, Fut>(&self, identifiers: Vec<String>, run_task: F) -> ResultCollector
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ExtractionResult>,
    {
        let total = identifiers.len();
        let mut collector = ResultCollector::with_capacity(total);

        let mut settled = stream::iter(identifiers)
            .map(run_task)
            .buffer_unordered(self.concurrency);

        while let Some(result) = settled.next().await {
            collector.push(result);
            debug!("{}/{} tasks settled", collector.len(), total);
        }

        debug!(
            "All tasks settled: {} succeeded, {} failed",
            collector.succeeded(),
            collector.failed()
        );

        collector
    }
}
