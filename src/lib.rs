// src/lib.rs

//! Skolinspektionen Content Access Engine
//!
//! Turns an in-memory publication index into ranked search results and an
//! arbitrary publication URL into fresh-or-cached Markdown, while respecting
//! the origin server's capacity and recovering from transient failures.

pub mod cache;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod utils;
