//! Error types for chatvault-core

use thiserror::Error;

/// Result type alias using chatvault-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in chatvault-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with an error status
    #[error("Remote API error: {0}")]
    Remote(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored or fetched record is missing a field we depend on
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}
