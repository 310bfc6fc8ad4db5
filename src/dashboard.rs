//! Dashboard session
//!
//! Ties the filter store, the reporting service and the chart preferences
//! together. Loads are split in three steps so that the caller decides when
//! to await:
//!
//! 1. `begin_*` snapshots the inputs (synchronous, needs `&mut self`)
//! 2. `run` performs the network work (owns everything it needs)
//! 3. `apply_*` stores the result, unless newer input overtook it
//!
//! Every filter, date or reset change advances the chart generation; a chart
//! load that finishes for an older generation is dropped.

use crate::charts::{transform_batch, ChartSeries};
use crate::filters::{
    FilterKey, FilterResult, FilterSelection, FilterStore, GroupBy, Invalidation, OptionState,
    OptionTicket,
};
use crate::preferences::PreferenceStore;
use crate::reporting::{
    fetch_all, ApiFilters, Dataset, OptionsRequest, ReportingApi, ReportingResult,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Shown when none of the chart datasets could be loaded
pub const LOAD_FAILED_MESSAGE: &str = "לא ניתן היה לטעון נתונים";

const DEFAULT_DATASET_TIMEOUT: Duration = Duration::from_secs(20);

/// An option load claimed from the filter store
pub struct OptionLoad {
    api: Arc<dyn ReportingApi>,
    ticket: OptionTicket,
    request: OptionsRequest,
}

impl OptionLoad {
    pub fn key(&self) -> FilterKey {
        self.ticket.key
    }

    pub fn request(&self) -> &OptionsRequest {
        &self.request
    }

    pub async fn run(self) -> OptionLoadResult {
        let key = self.ticket.key;
        let result = self
            .api
            .fetch_options(&self.request)
            .await
            .map(|outcome| outcome.into_state(key));

        OptionLoadResult {
            ticket: self.ticket,
            result,
        }
    }
}

/// Finished option load, waiting to be applied
pub struct OptionLoadResult {
    ticket: OptionTicket,
    result: ReportingResult<OptionState>,
}

/// A chart load for one input snapshot
pub struct ChartLoad {
    api: Arc<dyn ReportingApi>,
    generation: u64,
    filters: ApiFilters,
    time_box: Duration,
}

impl ChartLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filters(&self) -> &ApiFilters {
        &self.filters
    }

    /// Fetch all datasets and transform whatever loaded
    pub async fn run(self) -> ChartLoadResult {
        let batch = fetch_all(self.api.as_ref(), &self.filters, self.time_box).await;
        let failed: Vec<Dataset> = batch.failures().map(|(dataset, _)| dataset).collect();

        ChartLoadResult {
            generation: self.generation,
            group_by: self.filters.group_by,
            charts: transform_batch(&batch, self.filters.group_by),
            all_failed: batch.all_failed(),
            failed,
        }
    }
}

/// Finished chart load
#[derive(Debug)]
pub struct ChartLoadResult {
    pub generation: u64,
    pub group_by: GroupBy,
    pub charts: Vec<ChartSeries>,
    /// Datasets that produced no chart because their request failed
    pub failed: Vec<Dataset>,
    pub all_failed: bool,
}

/// One user's dashboard
pub struct Dashboard {
    api: Arc<dyn ReportingApi>,
    filters: FilterStore,
    preferences: PreferenceStore,
    charts: Vec<ChartSeries>,
    generation: u64,
    load_error: Option<String>,
    dataset_timeout: Duration,
}

impl Dashboard {
    pub fn new(api: Arc<dyn ReportingApi>, selection: FilterSelection, preferences: PreferenceStore) -> Self {
        Self {
            api,
            filters: FilterStore::new(selection),
            preferences,
            charts: Vec::new(),
            generation: 0,
            load_error: None,
            dataset_timeout: DEFAULT_DATASET_TIMEOUT,
        }
    }

    /// Time box applied to each dataset request
    pub fn with_dataset_timeout(mut self, timeout: Duration) -> Self {
        self.dataset_timeout = timeout;
        self
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut PreferenceStore {
        &mut self.preferences
    }

    /// Charts of the last applied load, hidden ones included
    pub fn charts(&self) -> &[ChartSeries] {
        &self.charts
    }

    /// Charts to render, in the user's order
    pub fn visible_charts(&self) -> Vec<&ChartSeries> {
        self.preferences.visible_ordered(&self.charts)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// User-visible error of the last chart load
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    fn advance(&mut self) {
        self.generation += 1;
    }

    // ===== Filter changes =====

    pub fn change_filter(&mut self, key: FilterKey, raw: &str) -> FilterResult<Invalidation> {
        let invalidation = self.filters.set_filter(key, raw)?;
        self.advance();
        Ok(invalidation)
    }

    /// Select an option by its displayed label; no-op if it is not loaded
    pub fn select_option(&mut self, key: FilterKey, label: &str) -> FilterResult<Option<Invalidation>> {
        let invalidation = self.filters.select_by_label(key, label)?;
        if invalidation.is_some() {
            self.advance();
        }
        Ok(invalidation)
    }

    pub fn change_dates(&mut self, start: NaiveDate, end: Option<NaiveDate>) -> FilterResult<GroupBy> {
        let group_by = self.filters.set_date_range(start, end)?;
        self.advance();
        Ok(group_by)
    }

    pub fn change_start_date(&mut self, start: NaiveDate) {
        self.filters.set_start_date(start);
        self.advance();
    }

    pub fn change_end_date(&mut self, end: NaiveDate) -> FilterResult<Option<GroupBy>> {
        let group_by = self.filters.set_end_date(end)?;
        self.advance();
        Ok(group_by)
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
        self.advance();
    }

    pub fn dismiss_notice(&mut self, key: FilterKey) {
        self.filters.dismiss_notice(key);
    }

    // ===== Option loading =====

    /// Claim an option load; `None` if cached or already in flight
    pub fn begin_option_load(&mut self, key: FilterKey) -> Option<OptionLoad> {
        let ticket = self.filters.begin_option_load(key)?;
        Some(OptionLoad {
            api: Arc::clone(&self.api),
            ticket,
            request: OptionsRequest::from_selection(key, self.filters.selection()),
        })
    }

    /// Store a finished option load; `false` if it was overtaken
    pub fn apply_option_load(&mut self, loaded: OptionLoadResult) -> bool {
        self.filters.complete_option_load(loaded.ticket, loaded.result)
    }

    /// Load options for `key` if needed, e.g. when its menu gains focus
    ///
    /// Returns `true` if a fetch was issued and its result stored.
    pub async fn load_options(&mut self, key: FilterKey) -> bool {
        let Some(load) = self.begin_option_load(key) else {
            return false;
        };
        let loaded = load.run().await;
        self.apply_option_load(loaded)
    }

    // ===== Chart loading =====

    /// Snapshot the current input; `None` while the date range is pending
    pub fn begin_chart_load(&mut self) -> Option<ChartLoad> {
        let filters = ApiFilters::from_selection(self.filters.selection())?;
        self.advance();
        tracing::info!(
            generation = self.generation,
            start = %filters.start_date,
            end = %filters.end_date,
            group_by = %filters.group_by,
            "Loading charts"
        );

        Some(ChartLoad {
            api: Arc::clone(&self.api),
            generation: self.generation,
            filters,
            time_box: self.dataset_timeout,
        })
    }

    /// Store a finished chart load; `false` if newer input overtook it
    pub fn apply_chart_load(&mut self, loaded: ChartLoadResult) -> bool {
        if loaded.generation != self.generation {
            tracing::debug!(
                generation = loaded.generation,
                current = self.generation,
                "Dropping stale chart load"
            );
            return false;
        }

        if loaded.all_failed {
            tracing::error!("No chart dataset could be loaded");
            self.load_error = Some(LOAD_FAILED_MESSAGE.to_string());
        } else {
            if !loaded.failed.is_empty() {
                tracing::warn!(failed = ?loaded.failed, "Some charts have no data");
            }
            self.load_error = None;
        }

        tracing::info!(charts = loaded.charts.len(), group_by = %loaded.group_by, "Charts loaded");
        self.charts = loaded.charts;
        true
    }

    /// Load charts for the current input and apply them
    pub async fn refresh_charts(&mut self) -> bool {
        let Some(load) = self.begin_chart_load() else {
            return false;
        };
        let loaded = load.run().await;
        self.apply_chart_load(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::titles;
    use crate::filters::{DateRange, FilterValue, EmptyReason};
    use crate::reporting::{OptionsOutcome, ReportingError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Serves options derived from the scoping selections and records
    /// every option request
    #[derive(Default)]
    struct FakeApi {
        option_requests: Mutex<Vec<OptionsRequest>>,
        failing: Vec<Dataset>,
    }

    impl FakeApi {
        fn failing(failing: Vec<Dataset>) -> Self {
            Self {
                failing,
                ..Default::default()
            }
        }

        fn requests_for(&self, key: FilterKey) -> Vec<OptionsRequest> {
            self.option_requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.target == key)
                .cloned()
                .collect()
        }
    }

    fn scope(request: &OptionsRequest, key: FilterKey) -> String {
        request
            .filters
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_default()
    }

    #[async_trait]
    impl ReportingApi for FakeApi {
        async fn fetch_options(&self, request: &OptionsRequest) -> ReportingResult<OptionsOutcome> {
            self.option_requests.lock().unwrap().push(request.clone());

            let records = match request.target {
                FilterKey::Agency => vec![
                    json!({"agency_id": 1, "agency_name": "A1"}),
                    json!({"agency_id": 2, "agency_name": "A2"}),
                ],
                FilterKey::Cluster => {
                    let agency = scope(request, FilterKey::Agency);
                    vec![json!({"Clusterid": format!("{}1", agency), "ClusterName": format!("C{}", agency)})]
                }
                FilterKey::SubCluster => {
                    let cluster = scope(request, FilterKey::Cluster);
                    vec![json!({"SubCluster": format!("S{}", cluster)})]
                }
                FilterKey::LineGroup => return Ok(OptionsOutcome::NoLineGroups),
                _ => return Ok(OptionsOutcome::NoRecords),
            };
            Ok(OptionsOutcome::Records(records))
        }

        async fn fetch_dataset(&self, dataset: Dataset, filters: &ApiFilters) -> ReportingResult<Vec<Value>> {
            if self.failing.contains(&dataset) {
                return Err(ReportingError::Unavailable);
            }
            let day = filters.start_date.format("%Y-%m-%d").to_string();
            Ok(match dataset {
                Dataset::PlanVsPerformance => vec![json!({"GroupBy": day, "Planned": 10, "Perfomerd": 9})],
                Dataset::PerformancePercentage => vec![json!({"GroupBy": day, "PerformancePercentage": 90})],
                Dataset::PlannedTrips => vec![json!({"GroupBy": day, "City": 6, "InterCity": 4})],
                Dataset::LinePerformanceDetails => vec![json!({"RouteNumber": "1", "Planned": 10})],
                Dataset::PlannedChanges => vec![json!({"GroupBy": day, "CombinedCategory": "Stops", "Amount": 1})],
                Dataset::TripPerformanceDetails => vec![json!({"GroupBy": "1:00PM", "OnTime": 9})],
            })
        }
    }

    fn week() -> FilterSelection {
        let end = NaiveDate::from_ymd_opt(2025, 4, 14).unwrap();
        FilterSelection::new(DateRange::last_days(end, 7))
    }

    fn dashboard(api: Arc<FakeApi>) -> Dashboard {
        Dashboard::new(api, week(), PreferenceStore::in_memory())
            .with_dataset_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_agency_change_forces_fresh_cluster_fetch() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api.clone());

        assert!(board.load_options(FilterKey::Agency).await);
        assert!(board.select_option(FilterKey::Agency, "A1").unwrap().is_some());

        assert!(board.load_options(FilterKey::Cluster).await);
        assert_eq!(board.filters().active_label(FilterKey::Agency), Some("A1"));
        board.select_option(FilterKey::Cluster, "C1").unwrap();
        assert!(board.load_options(FilterKey::SubCluster).await);
        assert!(board.filters().options(FilterKey::SubCluster).is_some());

        // Focus again: served from the cache
        assert!(!board.load_options(FilterKey::Cluster).await);
        assert_eq!(api.requests_for(FilterKey::Cluster).len(), 1);

        let invalidation = board.change_filter(FilterKey::Agency, "2").unwrap();
        assert!(invalidation.cleared.contains(&FilterKey::Cluster));
        assert_eq!(board.filters().selection().get(FilterKey::Cluster), &FilterValue::Empty);
        assert!(board.filters().options(FilterKey::Cluster).is_none());
        assert!(board.filters().options(FilterKey::SubCluster).is_none());

        assert!(board.load_options(FilterKey::Cluster).await);
        let requests = api.requests_for(FilterKey::Cluster);
        assert_eq!(requests.len(), 2);
        assert_eq!(scope(&requests[1], FilterKey::Agency), "2");
        let labels: Vec<&str> = board
            .filters()
            .options(FilterKey::Cluster)
            .unwrap()
            .options()
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, vec!["C2"]);
    }

    #[tokio::test]
    async fn test_option_load_overtaken_by_upstream_change_is_dropped() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);
        board.change_filter(FilterKey::Agency, "1").unwrap();

        let load = board.begin_option_load(FilterKey::Cluster).unwrap();
        assert!(board.begin_option_load(FilterKey::Cluster).is_none());
        let loaded = load.run().await;

        board.change_filter(FilterKey::Agency, "2").unwrap();
        assert!(!board.apply_option_load(loaded));
        assert!(board.filters().options(FilterKey::Cluster).is_none());
    }

    #[tokio::test]
    async fn test_no_line_groups_is_cached() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api.clone());

        assert!(board.load_options(FilterKey::LineGroup).await);
        assert_eq!(
            board.filters().options(FilterKey::LineGroup),
            Some(&OptionState::ConfirmedEmpty(EmptyReason::NoLineGroups))
        );
        assert!(board.filters().notice(FilterKey::LineGroup).is_some());

        assert!(!board.load_options(FilterKey::LineGroup).await);
        assert_eq!(api.requests_for(FilterKey::LineGroup).len(), 1);

        board.dismiss_notice(FilterKey::LineGroup);
        assert!(board.filters().notice(FilterKey::LineGroup).is_none());
    }

    #[tokio::test]
    async fn test_refresh_charts() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);

        assert!(board.refresh_charts().await);
        assert!(board.load_error().is_none());
        let titles_loaded: Vec<&str> = board.charts().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles_loaded,
            vec![
                titles::PLAN_VS_PERFORMANCE,
                titles::PERFORMANCE_PERCENTAGE,
                titles::PLANNED_CHANGES,
                titles::PLANNED_TRIPS,
                titles::PERIOD_DELAYS,
                titles::LINE_PERFORMANCE,
            ]
        );
    }

    #[tokio::test]
    async fn test_single_day_adds_hourly_chart() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);
        let day = NaiveDate::from_ymd_opt(2025, 4, 8).unwrap();
        assert_eq!(board.change_dates(day, None).unwrap(), GroupBy::Hour);

        assert!(board.refresh_charts().await);
        assert!(board
            .charts()
            .iter()
            .any(|c| c.title == titles::HOURLY_DELAYS));
    }

    #[tokio::test]
    async fn test_one_failed_dataset_keeps_the_rest() {
        let api = Arc::new(FakeApi::failing(vec![Dataset::PlannedTrips]));
        let mut board = dashboard(api);

        assert!(board.refresh_charts().await);
        assert!(board.load_error().is_none());
        assert_eq!(board.charts().len(), 5);
        assert!(!board.charts().iter().any(|c| c.title == titles::PLANNED_TRIPS));
    }

    #[tokio::test]
    async fn test_all_failed_sets_load_error() {
        let api = Arc::new(FakeApi::failing(Dataset::ALL.to_vec()));
        let mut board = dashboard(api);

        assert!(board.refresh_charts().await);
        assert_eq!(board.load_error(), Some(LOAD_FAILED_MESSAGE));
        assert!(board.charts().is_empty());
    }

    #[tokio::test]
    async fn test_stale_chart_load_is_dropped() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);

        let stale = board.begin_chart_load().unwrap();
        board.change_filter(FilterKey::City, "חיפה").unwrap();
        let fresh = board.begin_chart_load().unwrap();
        assert!(fresh.generation() > stale.generation());
        assert_eq!(
            fresh.filters().filters.get(&FilterKey::City),
            Some(&FilterValue::Text("חיפה".to_string()))
        );

        let fresh_result = fresh.run().await;
        let stale_result = stale.run().await;
        assert!(board.apply_chart_load(fresh_result));
        assert!(!board.apply_chart_load(stale_result));
        assert_eq!(board.charts().len(), 6);
    }

    #[tokio::test]
    async fn test_pending_range_blocks_chart_load() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);
        board.change_start_date(NaiveDate::from_ymd_opt(2025, 4, 8).unwrap());

        assert!(board.begin_chart_load().is_none());
        assert!(!board.refresh_charts().await);

        board
            .change_end_date(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap())
            .unwrap();
        assert!(board.refresh_charts().await);
    }

    #[tokio::test]
    async fn test_visible_charts_follow_preferences() {
        let api = Arc::new(FakeApi::default());
        let mut board = dashboard(api);
        board.refresh_charts().await;

        board
            .preferences_mut()
            .set_order(crate::preferences::order_from_titles([titles::LINE_PERFORMANCE]))
            .unwrap();
        board.preferences_mut().toggle_hidden(titles::PLANNED_TRIPS).unwrap();

        let visible: Vec<&str> = board.visible_charts().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(visible.len(), 5);
        assert_eq!(visible[0], titles::LINE_PERFORMANCE);
        assert!(!visible.contains(&titles::PLANNED_TRIPS));
    }
}
