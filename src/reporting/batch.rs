//! Chart dataset batch
//!
//! The six chart datasets are fetched concurrently and settled
//! independently: every request resolves to rows or a captured error, each
//! under its own time box, and one failure never affects the others.

use super::dto::ApiFilters;
use super::error::{ReportingError, ReportingResult};
use super::ReportingApi;
use futures_util::future::join_all;
use serde_json::Value;
use std::time::Duration;

/// The chart datasets served by the reporting service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    PlanVsPerformance,
    PerformancePercentage,
    PlannedTrips,
    LinePerformanceDetails,
    PlannedChanges,
    TripPerformanceDetails,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::PlanVsPerformance,
        Dataset::PerformancePercentage,
        Dataset::PlannedTrips,
        Dataset::LinePerformanceDetails,
        Dataset::PlannedChanges,
        Dataset::TripPerformanceDetails,
    ];

    /// Endpoint path under the service base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::PlanVsPerformance => "TripsPlannedVSPerformed",
            Self::PerformancePercentage => "TripsPlannedVSPerformedPercentage",
            Self::PlannedTrips => "TripsPlanned",
            Self::LinePerformanceDetails => "PerformanceDetailsForLine",
            Self::PlannedChanges => "TripsPlannedChanges",
            Self::TripPerformanceDetails => "TripsPerformanceDetails",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Settled outcome of one dataset request
#[derive(Debug)]
pub struct DatasetResult {
    pub dataset: Dataset,
    pub outcome: ReportingResult<Vec<Value>>,
}

/// Settled outcomes of all dataset requests
#[derive(Debug, Default)]
pub struct DatasetBatch {
    pub results: Vec<DatasetResult>,
}

impl DatasetBatch {
    /// Rows of a dataset that loaded; `None` if it failed or was not requested
    pub fn rows(&self, dataset: Dataset) -> Option<&[Value]> {
        self.results
            .iter()
            .find(|r| r.dataset == dataset)
            .and_then(|r| r.outcome.as_ref().ok())
            .map(Vec::as_slice)
    }

    pub fn failures(&self) -> impl Iterator<Item = (Dataset, &ReportingError)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.dataset, e)))
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    /// True when every request failed
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == 0
    }
}

/// Fetch every dataset concurrently and wait for all of them to settle
pub async fn fetch_all(api: &dyn ReportingApi, filters: &ApiFilters, time_box: Duration) -> DatasetBatch {
    let requests = Dataset::ALL.iter().map(|&dataset| async move {
        let outcome = match tokio::time::timeout(time_box, api.fetch_dataset(dataset, filters)).await {
            Ok(result) => result,
            Err(_) => Err(ReportingError::Timeout),
        };

        match &outcome {
            Ok(rows) => tracing::debug!(dataset = %dataset, rows = rows.len(), "Dataset loaded"),
            Err(e) => tracing::error!(dataset = %dataset, error = %e, "Dataset request failed"),
        }

        DatasetResult { dataset, outcome }
    });

    DatasetBatch {
        results: join_all(requests).await,
    }
}
