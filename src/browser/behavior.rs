use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::cli::config::PacingSettings;

/// Source of the randomized timings and selections used while driving pages.
///
/// Replaceable so tests can force deterministic timing.
#[cfg_attr(test, automock)]
pub trait Pacing: Send + Sync {
    /// Pause after navigation, before anything is read from the page
    fn settle_delay(&self) -> Duration;

    /// Pause after a session is released, before its slot admits the next task
    fn release_delay(&self) -> Duration;

    /// Pause between two attempts of the same task
    fn backoff_delay(&self) -> Duration;

    /// Pick an index in `0..len`; `len` is never zero
    fn pick(&self, len: usize) -> usize;
}

/// Pacing driven by a seedable RNG
pub struct RandomPacing {
    /// Configured delay ranges
    config: PacingSettings,

    /// Shared generator; never held across an await
    rng: Mutex<StdRng>,
}

impl RandomPacing {
    /// Create a pacing policy, seeded when the settings carry a seed
    pub fn new(config: PacingSettings) -> Self {
        let rng = match config.seed {
            Some(seed) => {
                debug!("Using seeded pacing RNG: {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    fn sample(&self, (min, max): (u64, u64)) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let ms = if min >= max { min } else { rng.gen_range(min..=max) };
        Duration::from_millis(ms)
    }
}

impl Pacing for RandomPacing {
    fn settle_delay(&self) -> Duration {
        self.sample(self.config.settle)
    }

    fn release_delay(&self) -> Duration {
        self.sample(self.config.release)
    }

    fn backoff_delay(&self) -> Duration {
        self.sample(self.config.backoff)
    }

    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..len)
    }
}

/// Sleep for `delay`, skipping the timer entirely for zero delays
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
