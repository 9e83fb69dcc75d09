//! Error types for memo-core

use thiserror::Error;

/// Result type alias using memo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in memo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document store rejected or failed a call
    #[error("Store error: {0}")]
    Store(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
