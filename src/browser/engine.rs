use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::browser::fingerprint::Identity;
use crate::error::AttemptError;
use crate::extractor::document::Document;

/// A rendered page exclusively owned by one task
#[async_trait]
pub trait PageSession: Document {
    /// The loaded page as a queryable document
    fn document(&self) -> &dyn Document;

    /// Apply user agent and locale to subsequent requests
    async fn apply_identity(&self, identity: &Identity) -> Result<(), AttemptError>;

    /// Load `url`, failing once `timeout` has passed
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AttemptError>;

    /// Tear the page down; further calls fail
    async fn close(&mut self) -> Result<()>;
}

/// The shared rendering engine: hands out and takes back sessions.
///
/// Only session creation and teardown go through it.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn acquire_session(&self) -> Result<Box<dyn PageSession>>;

    async fn release_session(&self, session: Box<dyn PageSession>) -> Result<()>;
}
