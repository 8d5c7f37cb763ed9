// src/pipeline/mod.rs

//! Outbound request discipline and refresh delta computation.
//!
//! Every network operation passes the same gauntlet: the token bucket rate
//! limiter, then the circuit breaker, then the retry policy around the
//! actual request. The delta module decides what a refresh actually needs
//! to fetch.

mod circuit_breaker;
mod delta;
mod rate_limiter;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use delta::{DeltaOutcome, DeltaRecord, compute_delta};
pub use rate_limiter::TokenBucket;
pub use retry::RetryPolicy;
