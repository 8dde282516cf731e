use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::browser::behavior::Pacing;
use crate::browser::engine::RenderEngine;
use crate::browser::fingerprint::IdentityPool;
use crate::browser::session::{SessionLease, SessionManager};
use crate::cli::config::OrchestratorSettings;
use crate::crawler::retry::{AttemptRunner, RetryController};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::task::{canonical_url, ExtractionResult, Task};
use crate::error::AttemptError;
use crate::extractor::ProductExtractor;
use crate::utils::metrics::{RunMetrics, RunSummary};

/// Everything a finished run hands to the sinks
#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<ExtractionResult>,
    pub summary: RunSummary,
}

/// Concurrent extraction orchestrator
pub struct ProductScraper {
    settings: OrchestratorSettings,
    sessions: SessionManager,
    retry: RetryController,
    extractor: ProductExtractor,
    metrics: RunMetrics,
}

impl ProductScraper {
    pub fn new(
        settings: OrchestratorSettings,
        engine: Arc<dyn RenderEngine>,
        pacing: Arc<dyn Pacing>,
        identities: IdentityPool,
        extractor: ProductExtractor,
    ) -> Self {
        let sessions = SessionManager::new(
            engine,
            pacing.clone(),
            identities,
            settings.navigation_timeout,
            settings.consent_pause,
        );
        let retry = RetryController::new(settings.max_attempts, pacing);

        Self {
            settings,
            sessions,
            retry,
            extractor,
            metrics: RunMetrics::new(),
        }
    }

    /// Extract every identifier; resolves once each one has a record
    pub async fn run(&self, identifiers: Vec<String>) -> RunReport {
        info!(
            "Starting extraction of {} identifier(s) with concurrency={}",
            identifiers.len(),
            self.settings.concurrency
        );

        let scheduler = Scheduler::new(self.settings.concurrency);
        let collector = scheduler.run(identifiers, |identifier| self.run_task(identifier)).await;

        RunReport {
            results: collector.into_results(),
            summary: self.metrics.summary().await,
        }
    }

    async fn run_task(&self, identifier: String) -> ExtractionResult {
        let timer = self.metrics.start_timer();
        let url = canonical_url(&self.settings.domain, &identifier);
        let mut task = Task::new(identifier);

        let mut attempt = ProductAttempt {
            lease: self.sessions.lease(url.clone()),
            extractor: &self.extractor,
            metrics: &self.metrics,
            identifier: task.identifier.clone(),
        };

        let outcome = self.retry.run(&mut task, &mut attempt).await;
        attempt.lease.release().await;
        debug_assert!(task.state.is_terminal());

        let record = match outcome {
            Ok(record) => {
                let preview = match &record.title {
                    Some(title) => title.chars().take(60).collect::<String>(),
                    None => "NO TITLE".to_string(),
                };
                info!("OK  {} -> {}", task.identifier, preview);
                record
            }
            Err(e) => {
                error!(
                    "FAIL {} after {} attempt(s): {}",
                    task.identifier, task.attempts, e
                );
                ExtractionResult::failed(task.identifier.clone(), url, e.to_string())
            }
        };

        self.metrics
            .record_task(&task.identifier, record.is_success(), timer.end())
            .await;

        record
    }
}

/// One task's navigate-and-extract cycle over its leased session
struct ProductAttempt<'a> {
    lease: SessionLease<'a>,
    extractor: &'a ProductExtractor,
    metrics: &'a RunMetrics,
    identifier: String,
}

#[async_trait]
impl<'a> AttemptRunner for ProductAttempt<'a> {
    async fn attempt(&mut self, _attempt: u32) -> Result<ExtractionResult, AttemptError> {
        let url = self.lease.url().to_string();

        match self.lease.prepare().await {
            Ok(doc) => {
                self.metrics.record_attempt(None).await;
                Ok(self.extractor.extract(doc, &self.identifier, &url).await)
            }
            Err(e) => {
                self.metrics.record_attempt(Some(e.kind())).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::behavior::RandomPacing;
    use crate::browser::testing::{FakeEngine, FakePage};
    use crate::cli::config::{ExtractorSettings, PacingSettings};
    use std::collections::HashSet;
    use std::time::Duration;

    fn settings(concurrency: usize) -> OrchestratorSettings {
        OrchestratorSettings {
            domain: "amazon.in".to_string(),
            concurrency,
            navigation_timeout: Duration::from_secs(30),
            max_attempts: 2,
            consent_pause: Duration::ZERO,
        }
    }

    fn scraper(engine: &FakeEngine, concurrency: usize) -> ProductScraper {
        let pacing = RandomPacing::new(PacingSettings {
            settle: (0, 0),
            release: (0, 0),
            backoff: (0, 0),
            seed: Some(42),
        });

        ProductScraper::new(
            settings(concurrency),
            Arc::new(engine.clone()),
            Arc::new(pacing),
            IdentityPool::new(vec!["agent-a".to_string(), "agent-b".to_string()], "en-US".to_string()),
            ProductExtractor::new(&ExtractorSettings {
                list_wait_ms: 0,
                poll_interval_ms: 1,
            }),
        )
    }

    #[tokio::test]
    async fn test_success_and_timeout_scenario() {
        let engine = FakeEngine::new();
        engine.set_page(
            "https://amazon.in/dp/B000000001",
            FakePage::html("<html><body><span id='productTitle'>Widget</span></body></html>"),
        );
        engine.set_page("https://amazon.in/dp/B000000002", FakePage::timeout());

        let report = scraper(&engine, 1)
            .run(vec!["B000000001".to_string(), "B000000002".to_string()])
            .await;

        assert_eq!(report.results.len(), 2);

        let first = report.results.iter().find(|r| r.identifier == "B000000001").unwrap();
        assert_eq!(first.title.as_deref(), Some("Widget"));
        assert!(first.price.is_none());
        assert!(first.error_message.is_none());

        let second = report.results.iter().find(|r| r.identifier == "B000000002").unwrap();
        assert_eq!(second.canonical_url, "https://amazon.in/dp/B000000002");
        assert!(second.error_message.as_deref().unwrap().contains("timed out"));
        assert!(second.title.is_none() && second.price.is_none() && second.attribute_table.is_none());

        assert_eq!(engine.navigations("https://amazon.in/dp/B000000001"), 1);
        assert_eq!(engine.navigations("https://amazon.in/dp/B000000002"), 2);
        assert_eq!(engine.acquired(), 2);
        assert_eq!(engine.released(), 2);

        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.attempts, 3);
    }

    #[tokio::test]
    async fn test_concurrency_bound_and_one_record_each() {
        let engine = FakeEngine::new();
        let ids: Vec<String> = (0..12).map(|i| format!("B{:09}", i)).collect();
        for (i, id) in ids.iter().enumerate() {
            let url = format!("https://amazon.in/dp/{}", id);
            let page = if i % 4 == 0 {
                FakePage::failing("net::ERR_CONNECTION_RESET")
            } else {
                FakePage::html("<h1 id='productTitle'>Item</h1>")
            };
            engine.set_page(&url, page.with_delay(Duration::from_millis(5)));
        }

        let report = scraper(&engine, 3).run(ids.clone()).await;

        assert_eq!(report.results.len(), ids.len());
        let unique: HashSet<_> = report.results.iter().map(|r| r.identifier.clone()).collect();
        assert_eq!(unique, ids.iter().cloned().collect::<HashSet<_>>());

        assert!(engine.max_active() <= 3);
        assert_eq!(engine.acquired(), engine.released());
        assert_eq!(report.summary.failed, 3);
    }

    #[tokio::test]
    async fn test_acquire_failure_is_retried() {
        let engine = FakeEngine::new();
        engine.set_page("https://amazon.in/dp/B000000001", FakePage::html("<h1 id='productTitle'>Widget</h1>"));
        engine.fail_acquires(1);

        let report = scraper(&engine, 1).run(vec!["B000000001".to_string()]).await;

        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].is_success());
        assert_eq!(engine.acquired(), 1);
        assert_eq!(engine.released(), 1);
        assert_eq!(report.summary.attempts, 2);
    }

    #[tokio::test]
    async fn test_acquire_never_succeeds() {
        let engine = FakeEngine::new();
        engine.fail_acquires(5);

        let report = scraper(&engine, 2).run(vec!["B000000009".to_string()]).await;

        let record = &report.results[0];
        assert!(record.error_message.as_deref().unwrap().starts_with("session unavailable"));
        assert_eq!(engine.acquired(), 0);
        assert_eq!(engine.released(), 0);
    }
}
