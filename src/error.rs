//! Error types for gigboard
//!
//! Handlers return [`Result`]; the router turns an escaped error into the 404 or 500
//! page, while mutation handlers map `Validation` and `Persistence` failures to a
//! flash message themselves.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Requested record or page does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed form field
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Constraint violations, connection failures and other database errors
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Template missing or unreadable
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Failures a mutation handler reports to the user instead of failing the request.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
