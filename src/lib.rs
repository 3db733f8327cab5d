// src/lib.rs
pub mod assignment;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod matching;
pub mod models;

// Re-export the entry points a presentation layer calls
pub use assignment::{AssignmentStore, AssignmentSubmitter, StatusTransition};
pub use config::DispatchConfig;
pub use directory::{DirectoryRecord, ResponderDirectory};
pub use error::{DispatchError, Result};
pub use matching::{distance, fetch_candidates, rank, Selection};
pub use models::{
    AssignmentSnapshot, AssignmentStatus, DistanceAnnotatedResponder, GeoPoint, RankLabel,
    Responder, ResponderId, ResponderKind, SnapshotEntry, Target, TargetId, TargetKind,
    TargetRecord,
};

pub use db::PgPool;
