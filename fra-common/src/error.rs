//! Common error types for the FRA services

use thiserror::Error;

/// Common result type for FRA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the FRA services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External scoring process failure
    #[error("External process error: {0}")]
    ExternalProcess(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
