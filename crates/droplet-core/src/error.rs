//! Error types for the droplet manager
//!
//! This module defines all error types used throughout the crate.

use std::path::Path;
use thiserror::Error;

/// Result type alias for droplet manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the droplet manager
#[derive(Error, Debug)]
pub enum Error {
    /// The cloud API could not be reached (connect, DNS, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The cloud API answered with a status other than the expected one
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// Operation that was attempted (e.g. "create droplet")
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body or a short description
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Zone file could not be read, written or locked
    #[error("Zone file error ({path}): {message}")]
    ZoneFile {
        /// Zone file path
        path: String,
        /// Error message
        message: String,
    },

    /// The DNS service reload action failed
    #[error("DNS reload failed: {0}")]
    Reload(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an unexpected-status error
    pub fn unexpected_status(
        operation: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a zone file error
    pub fn zone_file(path: &Path, message: impl Into<String>) -> Self {
        Self::ZoneFile {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create a reload error
    pub fn reload(msg: impl Into<String>) -> Self {
        Self::Reload(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a retry at a later time could succeed
    ///
    /// Nothing in this crate retries; the daemon logs these as warnings
    /// instead of errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Io(std::io::Error::other(err.to_string()))
    }
}
