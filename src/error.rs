// src/error.rs

use crate::models::ResponderKind;

/// Every failure the dispatch core reports to its caller.
///
/// None of these are retried internally; the caller decides whether to
/// retry or show an empty state.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Responder directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("No {kind} candidates available for assignment")]
    NoCandidates { kind: ResponderKind },

    #[error("Refusing to submit an empty selection")]
    EmptySelection,

    #[error("Target not found: {0}")]
    TargetNotFound(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Flattens an `anyhow` chain into a directory error, keeping the context.
    pub fn directory(err: anyhow::Error) -> Self {
        DispatchError::DirectoryUnavailable(format!("{:#}", err))
    }

    /// Flattens an `anyhow` chain into a persistence error, keeping the context.
    pub fn persistence(err: anyhow::Error) -> Self {
        DispatchError::PersistenceFailure(format!("{:#}", err))
    }
}
