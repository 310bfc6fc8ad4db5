//! Reporting service error types

use thiserror::Error;

/// Errors that can occur when talking to the reporting service
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Reporting service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The service answered 2xx but refused the request in its payload
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ReportingError {
    /// Classify a transport failure
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unavailable
        } else {
            Self::Request(e)
        }
    }
}

impl From<serde_json::Error> for ReportingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for reporting operations
pub type ReportingResult<T> = Result<T, ReportingError>;
