use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::browser::behavior::{pause, Pacing};
use crate::browser::engine::{PageSession, RenderEngine};
use crate::browser::fingerprint::IdentityPool;
use crate::error::AttemptError;
use crate::extractor::document::Document;

/// Accept-style controls of cookie consent dialogs
const CONSENT_CONTROLS: [&str; 5] = [
    "input[name='accept']",
    "input[id*='accept']",
    "input[value*='Accept']",
    "#sp-cc-accept",
    "button[id*='accept']",
];

/// Hands out per-task sessions from the shared engine
pub struct SessionManager {
    /// Shared rendering engine
    engine: Arc<dyn RenderEngine>,

    /// Timing and identity selection policy
    pacing: Arc<dyn Pacing>,

    /// User agents and locale to pick identities from
    identities: IdentityPool,

    /// Hard bound on a single navigation
    navigation_timeout: Duration,

    /// Pause after a consent control was clicked
    consent_pause: Duration,
}

impl SessionManager {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        pacing: Arc<dyn Pacing>,
        identities: IdentityPool,
        navigation_timeout: Duration,
        consent_pause: Duration,
    ) -> Self {
        Self {
            engine,
            pacing,
            identities,
            navigation_timeout,
            consent_pause,
        }
    }

    /// Start a lease for one task. No session is opened until the first prepare.
    pub fn lease(&self, url: impl Into<String>) -> SessionLease<'_> {
        SessionLease {
            manager: self,
            url: url.into(),
            session: None,
        }
    }
}

/// A task's exclusive hold on one session.
///
/// Must be ended with [`SessionLease::release`].
pub struct SessionLease<'a> {
    manager: &'a SessionManager,
    url: String,
    session: Option<Box<dyn PageSession>>,
}

impl<'a> SessionLease<'a> {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Load the task's page with a fresh identity and return it for reading.
    ///
    /// Opens the session on first use; a session from an earlier attempt is reused.
    pub async fn prepare(&mut self) -> Result<&dyn Document, AttemptError> {
        let manager = self.manager;

        if self.session.is_none() {
            let session = manager.engine.acquire_session().await
                .map_err(|e| AttemptError::SessionUnavailable(format!("{:#}", e)))?;
            self.session = Some(session);
        }
        let session = match self.session.as_deref() {
            Some(session) => session,
            None => return Err(AttemptError::SessionUnavailable("session missing".to_string())),
        };

        let identity = manager.identities.random_identity(manager.pacing.as_ref());
        session.apply_identity(&identity).await?;

        session.navigate(&self.url, manager.navigation_timeout).await?;

        pause(manager.pacing.settle_delay()).await;

        dismiss_consent(session.document(), manager.consent_pause).await;

        Ok(session.document())
    }

    /// Close the session (if one was opened) and pace the slot before it is reused
    pub async fn release(mut self) {
        let manager = self.manager;

        if let Some(session) = self.session.take() {
            if let Err(e) = manager.engine.release_session(session).await {
                warn!("Failed to release session for {}: {}", self.url, e);
            }
        }

        pause(manager.pacing.release_delay()).await;
    }
}

/// Best-effort click on the first consent control present
pub async fn dismiss_consent(doc: &dyn Document, settle: Duration) {
    for selector in CONSENT_CONTROLS {
        match doc.click(selector).await {
            Ok(true) => {
                debug!("Dismissed consent dialog via {}", selector);
                pause(settle).await;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                debug!("Consent control {} not clickable: {}", selector, e);
                return;
            }
        }
    }
}
