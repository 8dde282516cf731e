use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::browser::behavior::Pacing;
use crate::cli::config::BrowserSettings;

/// Browser identity applied to a session before navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
}

/// Fixed pool of user agents combined with a fixed locale
#[derive(Debug, Clone)]
pub struct IdentityPool {
    /// Candidate user agent strings
    user_agents: Vec<String>,

    /// Accept-Language header sent with every identity
    accept_language: String,
}

impl IdentityPool {
    /// Create a pool; an empty agent list is rejected by config validation
    pub fn new(user_agents: Vec<String>, accept_language: String) -> Self {
        Self {
            user_agents,
            accept_language,
        }
    }

    /// Build the pool from browser settings
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self::new(settings.user_agents.clone(), settings.accept_language.clone())
    }

    /// Select an identity using the pacing policy's selection
    pub fn random_identity(&self, pacing: &dyn Pacing) -> Identity {
        let user_agent = if self.user_agents.is_empty() {
            String::new()
        } else {
            let index = pacing.pick(self.user_agents.len()).min(self.user_agents.len() - 1);
            self.user_agents[index].clone()
        };

        debug!("Selected user agent: {}", user_agent);

        Identity {
            user_agent,
            accept_language: self.accept_language.clone(),
        }
    }
}
