//! Error types for fieldmatch

use crate::profile::ProfileKey;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// fieldmatch errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Document parse error: {0}")]
    DocumentParse(String),

    #[error("Profile parse error: {0}")]
    ProfileParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Stored value for '{key}' is not a YYYY-MM-DD date: {value:?}")]
    MalformedStoredDate { key: ProfileKey, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

/// Failures of the remote classification collaborator.
///
/// These never leave the pipeline: the remote strategy logs them and
/// reports "no match" so the next matcher runs.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote classifier timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout { elapsed_ms: u128, budget_ms: u128 },

    #[error("remote classifier transport error: {0}")]
    Transport(String),

    #[error("remote classifier returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // Timing is filled in by the remote strategy
            RemoteError::Timeout {
                elapsed_ms: 0,
                budget_ms: 0,
            }
        } else if e.is_decode() {
            RemoteError::InvalidResponse(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}
