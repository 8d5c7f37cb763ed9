//! Circuit breaker guarding the upstream origin.
//!
//! Closed until `failure_threshold` consecutive failures, then open for a
//! cooldown during which every acquisition fails fast. After the cooldown a
//! single half-open trial request is admitted; its outcome closes or
//! reopens the circuit.

use std::sync::Mutex;

use serde::Serialize;
use tokio::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::models::CircuitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Whether the single half-open trial has been handed out.
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Ask to make a request. `Err(CircuitOpen)` means fail fast without
    /// touching the network. A granted acquisition MUST be answered with
    /// exactly one `record_success` or `record_failure`.
    pub fn try_acquire(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::ZERO, |t| t.elapsed());
                if elapsed >= self.cooldown {
                    log::info!("Circuit breaker half-open, admitting trial request");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(AppError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(AppError::CircuitOpen)
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            log::info!("Circuit breaker closed after successful request");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.trial_in_flight = false;

        if inner.state == CircuitState::HalfOpen {
            // Failed trial: reopen for a fresh cooldown.
            log::warn!("Circuit breaker trial failed, reopening");
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            return;
        }

        inner.consecutive_failures += 1;
        if inner.state == CircuitState::Closed
            && inner.consecutive_failures >= self.failure_threshold
        {
            log::warn!(
                "Circuit breaker opened after {} consecutive failures",
                inner.consecutive_failures
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // State transitions are self-contained; a poisoned lock cannot
        // leave the breaker inconsistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown_seconds: u64) -> CircuitBreaker {
        CircuitBreaker::new(&CircuitConfig {
            failure_threshold: threshold,
            cooldown_seconds,
            count_client_errors: false,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let cb = breaker(5, 30);
        for _ in 0..4 {
            cb.try_acquire().unwrap();
            cb.record_failure();
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        cb.try_acquire().unwrap();
        cb.record_failure();

        assert_eq!(cb.state(), CircuitState::Open);
        assert!(matches!(cb.try_acquire(), Err(AppError::CircuitOpen)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let cb = breaker(3, 30);
        cb.try_acquire().unwrap();
        cb.record_failure();
        cb.try_acquire().unwrap();
        cb.record_failure();
        cb.try_acquire().unwrap();
        cb.record_success();

        assert_eq!(cb.consecutive_failures(), 0);
        cb.try_acquire().unwrap();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_cooldown_admits_one() {
        let cb = breaker(1, 30);
        cb.try_acquire().unwrap();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(31)).await;

        // Exactly one trial is admitted while it is in flight.
        cb.try_acquire().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(matches!(cb.try_acquire(), Err(AppError::CircuitOpen)));

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens() {
        let cb = breaker(1, 30);
        cb.try_acquire().unwrap();
        cb.record_failure();

        tokio::time::advance(Duration::from_secs(31)).await;
        cb.try_acquire().unwrap();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // A fresh cooldown applies after the failed trial.
        assert!(matches!(cb.try_acquire(), Err(AppError::CircuitOpen)));
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_fails_fast_during_cooldown() {
        let cb = breaker(1, 30);
        cb.try_acquire().unwrap();
        cb.record_failure();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(matches!(cb.try_acquire(), Err(AppError::CircuitOpen)));
    }
}
