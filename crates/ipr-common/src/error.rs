//! Error types shared across the IPR workspace

use thiserror::Error;

/// Result type alias for IPR operations
pub type Result<T> = std::result::Result<T, IprError>;

/// Main error type for IPR
#[derive(Error, Debug)]
pub enum IprError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
