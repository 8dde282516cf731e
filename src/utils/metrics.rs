use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Run-level counters, shared across tasks
#[derive(Debug, Clone)]
pub struct RunMetrics {
    /// In-memory metrics store
    metrics: Arc<Mutex<Metrics>>,
}

/// Metrics data structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    /// Start time of the run
    pub start_time: DateTime<Utc>,

    /// Attempts started
    pub attempts: usize,

    /// Failed attempts by failure kind
    pub attempt_failures: HashMap<String, usize>,

    /// Tasks that ended with a record
    pub succeeded_tasks: usize,

    /// Tasks that exhausted their attempts
    pub failed_tasks: usize,

    /// Task durations (identifier -> duration in milliseconds)
    pub task_durations: HashMap<String, u64>,
}

/// End-of-run summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub attempts: usize,
    pub elapsed_ms: i64,
    pub mean_task_ms: u64,
    /// Failed attempts by failure kind
    pub attempt_failures: BTreeMap<String, usize>,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let metrics = Metrics {
            start_time: Utc::now(),
            ..Default::default()
        };

        Self {
            metrics: Arc::new(Mutex::new(metrics)),
        }
    }

    /// Record a started attempt and, if it failed, its failure kind
    pub async fn record_attempt(&self, failure: Option<&str>) {
        let mut metrics = self.metrics.lock().await;
        metrics.attempts += 1;

        if let Some(kind) = failure {
            *metrics.attempt_failures.entry(kind.to_string()).or_default() += 1;
        }
    }

    /// Record a task reaching a terminal state
    pub async fn record_task(&self, identifier: &str, success: bool, duration_ms: u64) {
        let mut metrics = self.metrics.lock().await;

        if success {
            metrics.succeeded_tasks += 1;
        } else {
            metrics.failed_tasks += 1;
        }

        metrics.task_durations.insert(identifier.to_string(), duration_ms);
    }

    /// Start timing a task
    pub fn start_timer(&self) -> TaskTimer {
        TaskTimer {
            start: Instant::now(),
        }
    }

    /// Summarize the run so far
    pub async fn summary(&self) -> RunSummary {
        let metrics = self.metrics.lock().await;
        let tasks = metrics.succeeded_tasks + metrics.failed_tasks;

        let mean_task_ms = if metrics.task_durations.is_empty() {
            0
        } else {
            metrics.task_durations.values().sum::<u64>() / metrics.task_durations.len() as u64
        };

        RunSummary {
            tasks,
            succeeded: metrics.succeeded_tasks,
            failed: metrics.failed_tasks,
            attempts: metrics.attempts,
            elapsed_ms: (Utc::now() - metrics.start_time).num_milliseconds(),
            mean_task_ms,
            attempt_failures: metrics.attempt_failures.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }
}

/// Timer for measuring task durations
pub struct TaskTimer {
    /// Start time of the task
    start: Instant,
}

impl TaskTimer {
    /// End timing and get the duration in milliseconds
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
