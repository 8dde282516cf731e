use thiserror::Error;

/// Failure of a single navigate-and-extract attempt.
///
/// These never leave a task: the retry controller either retries or turns
/// the last one into the record's `errorMessage`.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("failed to apply browser identity: {0}")]
    Identity(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },
}

impl AttemptError {
    /// Short classification used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::SessionUnavailable(_) => "session",
            AttemptError::Identity(_) => "identity",
            AttemptError::Navigation { .. } => "navigation",
            AttemptError::NavigationTimeout { .. } => "timeout",
        }
    }
}
