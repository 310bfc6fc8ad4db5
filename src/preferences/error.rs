//! Preference store error types

use thiserror::Error;

/// Errors that can occur while persisting chart preferences
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PreferenceError {
    fn from(err: serde_json::Error) -> Self {
        PreferenceError::Serialization(err.to_string())
    }
}

/// Result type alias for preference operations
pub type PreferenceResult<T> = Result<T, PreferenceError>;
