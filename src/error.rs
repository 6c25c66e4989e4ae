//! Error handling for the school dashboard client

use std::fmt;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the school dashboard client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message decoded from the response body
        message: String,
    },

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Database query errors
    #[error("Database error: {0}")]
    Database(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Form validation errors
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Missing or malformed start-up configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// A request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// General errors
    #[error("{0}")]
    General(String),
}

/// How an error is surfaced to the person using the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shown inline next to the offending form field
    Validation,
    /// Shown as a transient notification; the action is abandoned
    Remote,
    /// Halts application start-up
    Fatal,
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Config(_) => ErrorKind::Fatal,
            _ => ErrorKind::Remote,
        }
    }

    /// The HTTP status returned by the provider, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the provider rejected the credentials or token
    pub fn is_rejected_credentials(&self) -> bool {
        matches!(self.status(), Some(400) | Some(401) | Some(403))
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}
