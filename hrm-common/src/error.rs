//! Common error types for the settings workflow engine

use thiserror::Error;

/// Common result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the settings engine and its consumers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A parameter name not owned by the addressed setting kind.
    /// This is a programming error, not a user-recoverable one.
    #[error("Unknown parameter {name} for {kind} settings")]
    UnknownParameter { kind: &'static str, name: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
