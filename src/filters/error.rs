//! Filter error types

use super::types::FilterKey;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while changing the filter selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The name does not correspond to any known filter
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// A numeric filter received a value that is not an integer id
    #[error("Filter {key} expects a numeric id, got {value:?}")]
    NotNumeric { key: FilterKey, value: String },

    /// End date precedes start date
    #[error("Invalid date range: {end} is before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// A date string could not be parsed as YYYY-MM-DD
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
