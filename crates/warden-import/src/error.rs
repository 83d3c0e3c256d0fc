//! Error types for import jobs

use crate::JobState;
use thiserror::Error;
use warden_sources::SourceError;

/// Errors that can occur while running an import job
///
/// Per-record and per-batch problems never surface here; they are counted in
/// the [`ImportReport`](crate::ImportReport). These errors mean the job could
/// not run at all.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Destination store error
    #[error("Store error: {0}")]
    Store(String),

    /// Legacy source could not be opened
    #[error("Source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A background task panicked or was aborted
    #[error("Worker error: {0}")]
    Worker(String),

    /// The pipeline attempted a state change its lifecycle does not allow
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the job was in
        from: JobState,
        /// State it tried to enter
        to: JobState,
    },
}

impl From<SourceError> for ImportError {
    fn from(e: SourceError) -> Self {
        ImportError::Source(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(e: tokio::task::JoinError) -> Self {
        ImportError::Worker(e.to_string())
    }
}
