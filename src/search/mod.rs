// src/search/mod.rs

//! Ranked search over the publication index.

mod fuzzy;
mod ranker;

pub use fuzzy::edit_distance_within;
pub use ranker::{SearchFilters, SearchHit, rank};
