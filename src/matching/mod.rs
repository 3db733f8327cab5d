// src/matching/mod.rs

// Nearest-responder resolution: distance, fetch, rank, select

pub mod distance;
pub mod fetcher;
pub mod ranker;
pub mod selector;

pub use distance::{checked_distance, distance};
pub use fetcher::fetch_candidates;
pub use ranker::rank;
pub use selector::Selection;
