// src/models/mod.rs

//! Domain models for the content access engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod content;
mod publication;

// Re-export all public types
pub use config::{
    CacheConfig, CircuitConfig, EngineConfig, HttpConfig, ListingConfig, RateLimitConfig,
    RetryConfig, SearchConfig,
};
pub use content::{PageContent, PageMetadata};
pub use publication::{PublicationRecord, PublicationType, RemoteSummary, fingerprint};
