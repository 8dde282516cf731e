//! In-memory rendering engine for exercising sessions and the orchestrator.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::engine::{PageSession, RenderEngine};
use crate::browser::fingerprint::Identity;
use crate::browser::snapshot::SnapshotDocument;
use crate::error::AttemptError;
use crate::extractor::document::{Document, RowCells};

#[derive(Debug, Clone)]
enum Outcome {
    Load(String),
    Timeout,
    Fail(String),
}

/// What navigating to a URL does
#[derive(Debug, Clone)]
pub struct FakePage {
    outcome: Outcome,
    delay: Duration,
}

impl FakePage {
    pub fn html(html: &str) -> Self {
        Self {
            outcome: Outcome::Load(html.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn timeout() -> Self {
        Self {
            outcome: Outcome::Timeout,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Outcome::Fail(reason.to_string()),
            delay: Duration::ZERO,
        }
    }

    /// Make navigation take `delay` of wall time
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The loaded page as a standalone document
    pub fn document(&self) -> FakeDocument {
        match &self.outcome {
            Outcome::Load(html) => FakeDocument::new(html),
            _ => FakeDocument::new(""),
        }
    }
}

/// Snapshot document that records clicks
#[derive(Debug)]
pub struct FakeDocument {
    inner: SnapshotDocument,
    clicks: Mutex<Vec<String>>,
}

impl FakeDocument {
    pub fn new(html: &str) -> Self {
        Self {
            inner: SnapshotDocument::new(html),
            clicks: Mutex::new(Vec::new()),
        }
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Document for FakeDocument {
    async fn text(&self, selector: &str) -> Result<Option<String>> {
        self.inner.text(selector).await
    }

    async fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.inner.attr(selector, name).await
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        self.inner.all_texts(selector).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.inner.exists(selector).await
    }

    async fn rows(&self, row: &str, key: &str, value: &str) -> Result<Vec<RowCells>> {
        self.inner.rows(row, key, value).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let found = self.inner.exists(selector).await?;
        if found {
            self.clicks.lock().unwrap().push(selector.to_string());
        }
        Ok(found)
    }
}

#[derive(Default)]
struct EngineState {
    pages: Mutex<HashMap<String, FakePage>>,
    navigations: Mutex<HashMap<String, usize>>,
    last_user_agent: Mutex<Option<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    failing_acquires: AtomicUsize,
}

/// Engine serving canned pages and counting session traffic
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, url: &str, page: FakePage) {
        self.state.pages.lock().unwrap().insert(url.to_string(), page);
    }

    /// Make the next `count` acquisitions fail
    pub fn fail_acquires(&self, count: usize) {
        self.state.failing_acquires.store(count, Ordering::SeqCst);
    }

    pub fn navigations(&self, url: &str) -> usize {
        self.state.navigations.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    pub fn last_user_agent(&self) -> Option<String> {
        self.state.last_user_agent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn acquire_session(&self) -> Result<Box<dyn PageSession>> {
        let failing = self.state.failing_acquires.load(Ordering::SeqCst);
        if failing > 0 {
            self.state.failing_acquires.store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("browser refused a new page");
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            loaded: Mutex::new(None),
        }))
    }

    async fn release_session(&self, mut session: Box<dyn PageSession>) -> Result<()> {
        session.close().await
    }
}

struct FakeSession {
    state: Arc<EngineState>,
    loaded: Mutex<Option<Arc<FakeDocument>>>,
}

impl FakeSession {
    fn current(&self) -> Result<Arc<FakeDocument>> {
        match self.loaded.lock().unwrap().as_ref() {
            Some(doc) => Ok(doc.clone()),
            None => anyhow::bail!("no page loaded"),
        }
    }
}

#[async_trait]
impl Document for FakeSession {
    async fn text(&self, selector: &str) -> Result<Option<String>> {
        self.current()?.text(selector).await
    }

    async fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.current()?.attr(selector, name).await
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        self.current()?.all_texts(selector).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.current()?.exists(selector).await
    }

    async fn rows(&self, row: &str, key: &str, value: &str) -> Result<Vec<RowCells>> {
        self.current()?.rows(row, key, value).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.current()?.click(selector).await
    }
}

#[async_trait]
impl PageSession for FakeSession {
    fn document(&self) -> &dyn Document {
        self
    }

    async fn apply_identity(&self, identity: &Identity) -> Result<(), AttemptError> {
        *self.state.last_user_agent.lock().unwrap() = Some(identity.user_agent.clone());
        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AttemptError> {
        *self.state.navigations.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let page = self.state.pages.lock().unwrap().get(url).cloned()
            .unwrap_or_else(|| FakePage::html("<html></html>"));

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        match page.outcome {
            Outcome::Load(html) => {
                *self.loaded.lock().unwrap() = Some(Arc::new(FakeDocument::new(&html)));
                Ok(())
            }
            Outcome::Timeout => Err(AttemptError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            Outcome::Fail(reason) => Err(AttemptError::Navigation {
                url: url.to_string(),
                reason,
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.state.released.fetch_add(1, Ordering::SeqCst);
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
