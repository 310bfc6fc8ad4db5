//! Reporting Service Integration
//!
//! Remote option fetcher and chart dataset queries.
//!
//! ## Architecture
//!
//! - **ReportingApi**: the seam the dashboard talks to
//! - **ReportingClient**: HTTP implementation over `reqwest`
//! - **dto**: request envelopes and response classification
//! - **batch**: settle-all fetch of the six chart datasets

mod batch;
mod client;
mod dto;
mod error;

pub use batch::{fetch_all, Dataset, DatasetBatch, DatasetResult};
pub use client::ReportingClient;
pub use dto::{
    classify_options_response, parse_dataset_body, ApiFilters, Envelope, OptionsOutcome,
    OptionsRequest, NO_LINE_GROUPS_MESSAGES, NO_LINE_GROUPS_STATUS, SUCCESS_MESSAGE,
};
pub use error::{ReportingError, ReportingResult};

use async_trait::async_trait;
use serde_json::Value;

/// Queries the dashboard issues against the reporting service
#[async_trait]
pub trait ReportingApi: Send + Sync {
    /// Option list for one filter, scoped by the other selections
    async fn fetch_options(&self, request: &OptionsRequest) -> ReportingResult<OptionsOutcome>;

    /// Raw rows of one chart dataset
    async fn fetch_dataset(&self, dataset: Dataset, filters: &ApiFilters) -> ReportingResult<Vec<Value>>;
}
