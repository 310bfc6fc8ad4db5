//! # Tripboard
//!
//! Trip performance dashboard pipeline for transit operators: a cascading
//! filter panel (agency, cluster, sub-cluster, city, route, line type, line
//! group, date range) drives six reporting-service datasets that are reshaped
//! into chart-ready series, shown in a user-chosen order.
//!
//! ## Modules
//!
//! - [`filters`]: selection state, dependency cascade and option cache
//! - [`reporting`]: option fetcher and the settle-all chart dataset batch
//! - [`charts`]: transformers from raw rows to chart series
//! - [`preferences`]: persisted chart order and visibility
//! - [`dashboard`]: session wiring with stale-load protection
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripboard::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = ReportingClient::new(config.api.clone())?;
//!
//!     let mut board = Dashboard::new(
//!         Arc::new(client),
//!         FilterSelection::default(),
//!         PreferenceStore::open(&config.preferences.dir),
//!     );
//!
//!     // Agency options, then narrow the selection
//!     board.load_options(FilterKey::Agency).await;
//!     board.change_filter(FilterKey::Agency, "3")?;
//!
//!     board.refresh_charts().await;
//!     for chart in board.visible_charts() {
//!         println!("{}: {} rows", chart.title, chart.table.rows.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod charts;
pub mod config;
pub mod dashboard;
pub mod filters;
pub mod preferences;
pub mod reporting;

// Re-export top-level types for convenience
pub use charts::{transform_batch, ChartKind, ChartOptions, ChartRow, ChartSeries, ChartTable};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, PreferencesConfig};

pub use dashboard::{ChartLoad, ChartLoadResult, Dashboard, OptionLoad, OptionLoadResult};

pub use filters::{
    DateRange, FilterError, FilterKey, FilterOption, FilterResult, FilterSelection, FilterStore,
    FilterValue, GroupBy, OptionState,
};

pub use preferences::{PreferenceError, PreferenceResult, PreferenceStore, Titled};

pub use reporting::{
    fetch_all, ApiFilters, Dataset, DatasetBatch, ReportingApi, ReportingClient, ReportingError,
    ReportingResult,
};
