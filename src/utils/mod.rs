// src/utils/mod.rs

//! Shared utilities.

pub mod url;

pub use url::{normalize_key, record_id, resolve};
