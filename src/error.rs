//! Error types for updown.

use thiserror::Error;

/// Common error type for updown.
///
/// The first four variants are the caller-facing taxonomy; their message is
/// reported verbatim at the HTTP boundary. The remaining variants are storage
/// medium or startup failures and are reported as a generic internal error.
#[derive(Error, Debug)]
pub enum UpdownError {
    /// Bad upload input: invalid name, name collision, unreadable payload.
    #[error("{0}")]
    Upload(String),

    /// Bad download input (invalid name).
    #[error("{0}")]
    Download(String),

    /// The requested file is not stored.
    #[error("{0}")]
    NotFound(String),

    /// Storage medium failure that is reported to the caller as-is.
    #[error("{0}")]
    Internal(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for UpdownError {
    fn from(e: sqlx::Error) -> Self {
        UpdownError::Database(e.to_string())
    }
}

/// Result type alias for updown operations.
pub type Result<T> = std::result::Result<T, UpdownError>;
