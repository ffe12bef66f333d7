//! Error types for armory-journal

use thiserror::Error;

/// History error type
#[derive(Debug, Error)]
pub enum Error {
    /// No record with this sequence number
    #[error("History record not found: {0}")]
    RecordNotFound(u64),

    /// Export error
    #[error("Export error: {0}")]
    ExportError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, Error>;
