//! Error types for armory-script

use thiserror::Error;

/// Definition loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Invalid formula '{name}': {source}")]
    InvalidFormula {
        name: String,
        #[source]
        source: armory_core::Error,
    },

    #[error("Unknown formula: {0}")]
    UnknownFormula(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
