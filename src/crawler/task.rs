use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Lifecycle of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// One identifier's unit of work
#[derive(Debug, Clone)]
pub struct Task {
    /// Identifier naming the target page
    pub identifier: String,

    /// Attempts started so far
    pub attempts: u32,

    /// Current state
    pub state: TaskState,
}

impl Task {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            attempts: 0,
            state: TaskState::Pending,
        }
    }
}

/// Terminal record for one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub identifier: String,
    pub canonical_url: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub image: Option<String>,
    pub availability: Option<String>,
    pub best_seller_rank: Option<String>,
    pub product_description: Option<String>,
    pub bullet_points: Option<Vec<String>>,
    pub attribute_table: Option<BTreeMap<String, String>>,
    pub timestamp: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl ExtractionResult {
    /// Record with every extracted field empty
    pub fn empty(identifier: impl Into<String>, canonical_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            canonical_url: canonical_url.into(),
            title: None,
            price: None,
            rating: None,
            review_count: None,
            image: None,
            availability: None,
            best_seller_rank: None,
            product_description: None,
            bullet_points: None,
            attribute_table: None,
            timestamp: Utc::now(),
            error_message: None,
        }
    }

    /// Record for a task whose attempts were exhausted
    pub fn failed(
        identifier: impl Into<String>,
        canonical_url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error_message: Some(error.into()),
            ..Self::empty(identifier, canonical_url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Canonical product page URL for an identifier
pub fn canonical_url(domain: &str, identifier: &str) -> String {
    let base = if domain.contains("://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", domain.trim_end_matches('/'))
    };

    match url::Url::parse(&base).and_then(|u| u.join(&format!("/dp/{}", identifier))) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}/dp/{}", base, identifier),
    }
}
