//! Retry with exponential backoff and jitter for transient failures.

use std::future::Future;

use rand::Rng;
use tokio::time::{Duration, sleep};

use crate::error::Result;
use crate::models::RetryConfig;

/// Runs an operation up to `max_attempts` times, sleeping between attempts
/// with exponentially growing, optionally jittered delays. Only transient
/// errors are retried; anything else returns immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        self.config.max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delay before the retry following `attempt` (0-based): the base delay
    /// doubled per attempt, capped, then jittered by up to ±25%.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .initial_delay_ms
            .saturating_mul(1u64 << attempt.min(20))
            .min(self.config.max_delay_ms);

        let ms = if self.config.jitter {
            let factor = rand::thread_rng().gen_range(0.75..=1.25);
            (base as f64 * factor) as u64
        } else {
            base
        };
        Duration::from_millis(ms)
    }
}
