use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::browser::behavior::{pause, Pacing};
use crate::crawler::task::{ExtractionResult, Task, TaskState};
use crate::error::AttemptError;

/// One navigate-and-extract cycle, repeatable
#[async_trait]
pub trait AttemptRunner: Send {
    async fn attempt(&mut self, attempt: u32) -> Result<ExtractionResult, AttemptError>;
}

/// Drives a task through bounded attempts with randomized backoff
pub struct RetryController {
    /// Attempts per task, at least one
    max_attempts: u32,

    /// Source of backoff delays
    pacing: Arc<dyn Pacing>,
}

impl RetryController {
    pub fn new(max_attempts: u32, pacing: Arc<dyn Pacing>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pacing,
        }
    }

    /// Run attempts until one succeeds or the budget is spent.
    ///
    /// Leaves `task` in a terminal state. The error is the last attempt's.
    pub async fn run(
        &self,
        task: &mut Task,
        runner: &mut dyn AttemptRunner,
    ) -> Result<ExtractionResult, AttemptError> {
        task.state = TaskState::InFlight;

        loop {
            task.attempts += 1;
            let attempt = task.attempts;

            match runner.attempt(attempt).await {
                Ok(result) => {
                    task.state = TaskState::Succeeded;
                    return Ok(result);
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!("Attempt {} failed for {}: {}", attempt, task.identifier, e);
                    pause(self.pacing.backoff_delay()).await;
                }
                Err(e) => {
                    warn!("Attempt {} failed for {}: {}", attempt, task.identifier, e);
                    task.state = TaskState::Failed;
                    return Err(e);
                }
            }
        }
    }
}
