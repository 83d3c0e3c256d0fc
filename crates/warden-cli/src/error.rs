//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Import could not run
    #[error(transparent)]
    Import(#[from] warden_import::ImportError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] warden_store::StoreError),

    /// Source error
    #[error("Source error: {0}")]
    Source(#[from] warden_sources::SourceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The import job stopped before the end of the source
    #[error("Import {0}")]
    JobFailed(String),
}
