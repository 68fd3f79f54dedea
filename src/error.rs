//! Error types for ODS operations.
//!
//! Validation failures are deliberately NOT represented here: a record that
//! fails the standard's checks is carried as a list of reason strings on the
//! owning instance, so callers can decide to cull, override, or abort.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ODS operations.
pub type OdsResult<T> = Result<T, OdsError>;

/// Error type for ODS operations.
#[derive(Debug, Error)]
pub enum OdsError {
    /// Requested ODS standard version is not registered.
    #[error("unknown ODS standard version '{0}'")]
    UnknownVersion(String),

    /// Operation referenced an instance name that does not exist.
    #[error("no ODS instance named '{0}'")]
    UnknownInstance(String),

    /// Attempted to create an instance under a name already in use.
    #[error("ODS instance '{0}' already exists")]
    DuplicateInstance(String),

    /// Input payload lacks the expected top-level data key or cannot be
    /// interpreted as the persisted-collection format.
    #[error("malformed ODS payload: {0}")]
    Format(String),

    /// Caller-supplied options are insufficient or inconsistent.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// A collaborator (remote fetch, coordinate transform) failed.
    #[error("collaborator failure: {0}")]
    Collaborator(String),

    /// File read/write failure at the I/O boundary.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OdsError {
    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Create a parameter error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    /// Create a collaborator error.
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    /// Create an I/O error tagged with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
