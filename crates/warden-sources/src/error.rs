//! Error types for source adapters

use thiserror::Error;

/// Errors that end a source stream
///
/// A single unusable record is not an error: adapters report it as
/// [`crate::SourceItem::Malformed`] and keep going.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The legacy database could not be read
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A legacy file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A legacy file is not valid JSON at the document level
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing to import at the given location
    #[error("Source not found: {0}")]
    NotFound(String),

    /// The background reader stopped without finishing
    #[error("Reader interrupted: {0}")]
    Interrupted(String),
}
