//! Filter State Store
//!
//! Holds the current selection and the per-filter option cache. All changes
//! go through `set_filter` / the date setters / `reset`; the store applies
//! the dependency cascade itself but never performs I/O. Option loads are
//! handed out as `OptionTicket`s and completed later, so a load that was
//! overtaken by an upstream change can be recognised and dropped.

use super::error::{FilterError, FilterResult};
use super::hierarchy;
use super::options::{mapping, FilterOption};
use super::types::{DateRange, FilterKey, FilterSelection, FilterValue, GroupBy};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Notice shown when the user has no line groups
pub const NO_LINE_GROUPS_NOTICE: &str = "אין קבוצות קווים זמינות למשתמש זה";

/// Why an option list is known to be empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The server answered successfully with no records
    NoRecords,
    /// The server reported that the user has no line groups
    NoLineGroups,
}

/// Cached option list for one filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionState {
    Loaded(Vec<FilterOption>),
    /// Server confirmed there is nothing to choose; never re-queried
    ConfirmedEmpty(EmptyReason),
}

impl OptionState {
    pub fn options(&self) -> &[FilterOption] {
        match self {
            Self::Loaded(options) => options,
            Self::ConfirmedEmpty(_) => &[],
        }
    }

    pub fn is_confirmed_empty(&self) -> bool {
        matches!(self, Self::ConfirmedEmpty(_))
    }
}

/// Outcome of a filter change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub changed: FilterKey,
    /// Dependent filters whose selection and options were dropped
    pub cleared: Vec<FilterKey>,
}

/// Handle for an in-flight option load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionTicket {
    pub key: FilterKey,
    epoch: u64,
}

/// Filter selection plus option cache
#[derive(Debug, Default)]
pub struct FilterStore {
    selection: FilterSelection,
    options: HashMap<FilterKey, OptionState>,
    pending: HashSet<FilterKey>,
    epochs: HashMap<FilterKey, u64>,
    dismissed: HashSet<FilterKey>,
    last_error: Option<String>,
}

impl FilterStore {
    pub fn new(selection: FilterSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Set one filter and cascade to its dependents
    ///
    /// Numeric filters (agency, cluster, line group) are coerced to integers;
    /// an empty string clears the filter.
    pub fn set_filter(&mut self, key: FilterKey, raw: &str) -> FilterResult<Invalidation> {
        let value = coerce(key, raw)?;
        tracing::debug!(filter = %key, value = %value, "Filter changed");
        self.selection.set(key, value);

        let cleared = hierarchy::invalidated_by(key);
        for dependent in &cleared {
            self.selection.clear(*dependent);
            self.evict(*dependent);
        }

        if !cleared.is_empty() {
            tracing::debug!(filter = %key, cleared = ?cleared, "Dependent filters reset");
        }

        Ok(Invalidation {
            changed: key,
            cleared,
        })
    }

    /// `set_filter` by filter name
    pub fn set_filter_named(&mut self, name: &str, raw: &str) -> FilterResult<Invalidation> {
        let key: FilterKey = name.parse()?;
        self.set_filter(key, raw)
    }

    /// Select the option whose label is `label`
    ///
    /// Returns `Ok(None)` when the options are not loaded or no option
    /// carries that label.
    pub fn select_by_label(&mut self, key: FilterKey, label: &str) -> FilterResult<Option<Invalidation>> {
        let value = match self
            .options
            .get(&key)
            .and_then(|state| state.options().iter().find(|o| o.label == label))
        {
            Some(option) => option.value.clone(),
            None => return Ok(None),
        };
        self.set_filter(key, &value).map(Some)
    }

    /// Label of the currently selected option, if it is among the loaded options
    pub fn active_label(&self, key: FilterKey) -> Option<&str> {
        let selected = self.selection.get(key);
        if selected.is_empty() {
            return None;
        }
        let value = selected.as_option_value();
        self.options
            .get(&key)?
            .options()
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    /// Set both bounds; `None` for `end` means a single day
    ///
    /// Date changes never touch the categorical filters.
    pub fn set_date_range(&mut self, start: NaiveDate, end: Option<NaiveDate>) -> FilterResult<GroupBy> {
        let range = match end {
            Some(end) => DateRange::new(start, end)?,
            None => DateRange::single_day(start),
        };
        self.selection.set_dates(Some(range.start()), Some(range.end()));
        tracing::debug!(start = %range.start(), end = %range.end(), group_by = %range.group_by(), "Date range changed");
        Ok(range.group_by())
    }

    /// Start a new range; it stays pending until `set_end_date`
    pub fn set_start_date(&mut self, start: NaiveDate) {
        self.selection.set_dates(Some(start), None);
    }

    /// Complete a pending range
    pub fn set_end_date(&mut self, end: NaiveDate) -> FilterResult<Option<GroupBy>> {
        match self.selection.start_date() {
            Some(start) if end < start => Err(FilterError::InvalidDateRange { start, end }),
            start => {
                self.selection.set_dates(start, Some(end));
                Ok(self.selection.group_by())
            }
        }
    }

    /// Clear every categorical filter and the option cache; dates are kept
    pub fn reset(&mut self) {
        self.selection.clear_categorical();
        for key in FilterKey::ALL {
            self.evict(key);
        }
        self.last_error = None;
        tracing::debug!("Filters reset");
    }

    pub fn options(&self, key: FilterKey) -> Option<&OptionState> {
        self.options.get(&key)
    }

    pub fn is_loading(&self, key: FilterKey) -> bool {
        self.pending.contains(&key)
    }

    /// Claim an option load for `key`
    ///
    /// Returns `None` when the options are cached (confirmed-empty included)
    /// or a load is already in flight.
    pub fn begin_option_load(&mut self, key: FilterKey) -> Option<OptionTicket> {
        if self.options.contains_key(&key) || !self.pending.insert(key) {
            return None;
        }
        self.last_error = None;
        Some(OptionTicket {
            key,
            epoch: self.epoch(key),
        })
    }

    /// Complete an option load
    ///
    /// Returns `false` if the ticket was overtaken by an invalidation; the
    /// result is then dropped. Failures are recorded for display and leave
    /// the key uncached so the next focus retries.
    pub fn complete_option_load<E: std::fmt::Display>(
        &mut self,
        ticket: OptionTicket,
        result: Result<OptionState, E>,
    ) -> bool {
        if ticket.epoch != self.epoch(ticket.key) {
            tracing::debug!(filter = %ticket.key, "Dropping stale option load");
            return false;
        }
        self.pending.remove(&ticket.key);

        match result {
            Ok(state) => {
                if let OptionState::ConfirmedEmpty(reason) = &state {
                    tracing::info!(filter = %ticket.key, reason = ?reason, "No options available");
                }
                self.options.insert(ticket.key, state);
            }
            Err(e) => {
                tracing::warn!(filter = %ticket.key, error = %e, "Failed to load filter options");
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Notice to show for `key`, unless dismissed this session
    pub fn notice(&self, key: FilterKey) -> Option<&'static str> {
        match self.options.get(&key) {
            Some(OptionState::ConfirmedEmpty(EmptyReason::NoLineGroups))
                if !self.dismissed.contains(&key) =>
            {
                Some(NO_LINE_GROUPS_NOTICE)
            }
            _ => None,
        }
    }

    pub fn dismiss_notice(&mut self, key: FilterKey) {
        self.dismissed.insert(key);
    }

    /// Last option-load failure, for display
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn epoch(&self, key: FilterKey) -> u64 {
        self.epochs.get(&key).copied().unwrap_or(0)
    }

    fn evict(&mut self, key: FilterKey) {
        self.options.remove(&key);
        self.pending.remove(&key);
        *self.epochs.entry(key).or_insert(0) += 1;
    }
}

fn coerce(key: FilterKey, raw: &str) -> FilterResult<FilterValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(FilterValue::Empty);
    }
    if mapping(key).numeric {
        raw.parse::<i64>()
            .map(FilterValue::Number)
            .map_err(|_| FilterError::NotNumeric {
                key,
                value: raw.to_string(),
            })
    } else {
        Ok(FilterValue::Text(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loaded(options: &[(&str, &str)]) -> Result<OptionState, String> {
        Ok(OptionState::Loaded(
            options
                .iter()
                .map(|(l, v)| FilterOption::new(*l, *v))
                .collect(),
        ))
    }

    fn store_with_all_loaded() -> FilterStore {
        let mut store = FilterStore::default();
        for key in FilterKey::ALL {
            let ticket = store.begin_option_load(key).unwrap();
            assert!(store.complete_option_load(ticket, loaded(&[("x", "1")])));
        }
        store
    }

    #[test]
    fn test_numeric_coercion() {
        let mut store = FilterStore::default();
        store.set_filter(FilterKey::Agency, "3").unwrap();
        assert_eq!(store.selection().get(FilterKey::Agency), &FilterValue::Number(3));

        store.set_filter(FilterKey::City, "חיפה").unwrap();
        assert_eq!(
            store.selection().get(FilterKey::City),
            &FilterValue::Text("חיפה".into())
        );

        let err = store.set_filter(FilterKey::Cluster, "north").unwrap_err();
        assert!(matches!(err, FilterError::NotNumeric { .. }));
    }

    #[test]
    fn test_empty_value_clears() {
        let mut store = FilterStore::default();
        store.set_filter(FilterKey::LineType, "עירוני").unwrap();
        store.set_filter(FilterKey::LineType, "").unwrap();
        assert!(store.selection().get(FilterKey::LineType).is_empty());
    }

    #[test]
    fn test_unknown_filter_name() {
        let mut store = FilterStore::default();
        assert!(matches!(
            store.set_filter_named("Depot", "1"),
            Err(FilterError::UnknownFilter(_))
        ));
        assert!(store.set_filter_named("linegroup", "4").is_ok());
    }

    #[test]
    fn test_cascade_clears_selection_and_cache() {
        let mut store = store_with_all_loaded();
        store.set_filter(FilterKey::Agency, "1").unwrap();
        store.set_filter(FilterKey::Cluster, "2").unwrap();
        store.set_filter(FilterKey::SubCluster, "s").unwrap();
        store.set_filter(FilterKey::City, "c").unwrap();
        store.set_filter(FilterKey::RouteNumber, "r").unwrap();
        store.set_filter(FilterKey::LineType, "t").unwrap();
        store.set_filter(FilterKey::LineGroup, "5").unwrap();

        let invalidation = store.set_filter(FilterKey::Agency, "9").unwrap();
        assert_eq!(invalidation.cleared, hierarchy::invalidated_by(FilterKey::Agency));

        for key in &invalidation.cleared {
            assert!(store.selection().get(*key).is_empty(), "{} not cleared", key);
            assert!(store.options(*key).is_none(), "{} still cached", key);
        }
        assert_eq!(store.selection().get(FilterKey::Agency), &FilterValue::Number(9));
        assert_eq!(
            store.selection().get(FilterKey::LineType),
            &FilterValue::Text("t".into())
        );
        assert!(store.options(FilterKey::Agency).is_some());
        assert!(store.options(FilterKey::LineType).is_some());
    }

    #[test]
    fn test_every_key_cascades_to_deeper_keys() {
        for key in FilterKey::ALL {
            let mut store = store_with_all_loaded();
            let invalidation = store.set_filter(key, "1").unwrap();
            for dependent in invalidation.cleared {
                assert!(hierarchy::depth(dependent) > hierarchy::depth(key));
                assert!(store.options(dependent).is_none());
            }
        }
    }

    #[test]
    fn test_date_change_does_not_cascade() {
        let mut store = store_with_all_loaded();
        store.set_filter(FilterKey::Agency, "1").unwrap();
        store.set_filter(FilterKey::Cluster, "2").unwrap();

        // Cluster options were evicted by the agency change; load them again
        let ticket = store.begin_option_load(FilterKey::Cluster).unwrap();
        assert!(store.complete_option_load(ticket, loaded(&[("c", "2")])));

        let group_by = store.set_date_range(date(2025, 4, 8), None).unwrap();
        assert_eq!(group_by, GroupBy::Hour);
        assert_eq!(store.selection().get(FilterKey::Cluster), &FilterValue::Number(2));
        assert!(store.options(FilterKey::Agency).is_some());
        assert!(store.options(FilterKey::Cluster).is_some());

        let group_by = store
            .set_date_range(date(2025, 4, 1), Some(date(2025, 4, 8)))
            .unwrap();
        assert_eq!(group_by, GroupBy::Day);
        assert_eq!(store.selection().get(FilterKey::Agency), &FilterValue::Number(1));
        assert!(store.options(FilterKey::Agency).is_some());
        assert!(store.options(FilterKey::Cluster).is_some());
    }

    #[test]
    fn test_pending_date_range() {
        let mut store = FilterStore::default();
        store.set_start_date(date(2025, 4, 1));
        assert!(store.selection().is_pending());

        assert!(store.set_end_date(date(2025, 3, 1)).is_err());
        assert!(store.selection().is_pending());

        assert_eq!(store.set_end_date(date(2025, 4, 1)).unwrap(), Some(GroupBy::Hour));
        assert!(!store.selection().is_pending());
    }

    #[test]
    fn test_reset_keeps_dates() {
        let mut store = store_with_all_loaded();
        store
            .set_date_range(date(2025, 4, 1), Some(date(2025, 4, 8)))
            .unwrap();
        store.set_filter(FilterKey::LineType, "t").unwrap();

        store.reset();

        assert_eq!(store.selection().selected().count(), 0);
        assert_eq!(store.selection().start_date(), Some(date(2025, 4, 1)));
        assert_eq!(store.selection().end_date(), Some(date(2025, 4, 8)));
        for key in FilterKey::ALL {
            assert!(store.options(key).is_none());
        }
    }

    #[test]
    fn test_duplicate_load_is_skipped() {
        let mut store = FilterStore::default();
        let ticket = store.begin_option_load(FilterKey::Agency).unwrap();
        assert!(store.is_loading(FilterKey::Agency));
        assert!(store.begin_option_load(FilterKey::Agency).is_none());

        store.complete_option_load(ticket, loaded(&[("אגד", "3")]));
        assert!(!store.is_loading(FilterKey::Agency));
        // Cached now
        assert!(store.begin_option_load(FilterKey::Agency).is_none());
    }

    #[test]
    fn test_stale_option_load_is_dropped() {
        let mut store = FilterStore::default();
        store.set_filter(FilterKey::Agency, "1").unwrap();
        let ticket = store.begin_option_load(FilterKey::Cluster).unwrap();

        // Upstream change while the cluster load is in flight
        store.set_filter(FilterKey::Agency, "2").unwrap();
        assert!(!store.is_loading(FilterKey::Cluster));

        assert!(!store.complete_option_load(ticket, loaded(&[("old", "7")])));
        assert!(store.options(FilterKey::Cluster).is_none());
        assert!(store.begin_option_load(FilterKey::Cluster).is_some());
    }

    #[test]
    fn test_failed_load_allows_retry() {
        let mut store = FilterStore::default();
        let ticket = store.begin_option_load(FilterKey::City).unwrap();
        assert!(store.complete_option_load(ticket, Err::<OptionState, _>("connection refused")));

        assert_eq!(store.last_error(), Some("connection refused"));
        assert!(store.options(FilterKey::City).is_none());
        assert!(store.begin_option_load(FilterKey::City).is_some());
    }

    #[test]
    fn test_no_line_groups_is_terminal() {
        let mut store = FilterStore::default();
        let ticket = store.begin_option_load(FilterKey::LineGroup).unwrap();
        store.complete_option_load(
            ticket,
            Ok::<_, String>(OptionState::ConfirmedEmpty(EmptyReason::NoLineGroups)),
        );

        assert!(store.last_error().is_none());
        assert!(store.begin_option_load(FilterKey::LineGroup).is_none());
        assert_eq!(store.notice(FilterKey::LineGroup), Some(NO_LINE_GROUPS_NOTICE));

        store.dismiss_notice(FilterKey::LineGroup);
        assert_eq!(store.notice(FilterKey::LineGroup), None);
    }

    #[test]
    fn test_select_by_label() {
        let mut store = FilterStore::default();
        assert_eq!(store.select_by_label(FilterKey::Agency, "אגד").unwrap(), None);

        let ticket = store.begin_option_load(FilterKey::Agency).unwrap();
        store.complete_option_load(ticket, loaded(&[("אגד", "3"), ("דן", "5")]));

        let invalidation = store.select_by_label(FilterKey::Agency, "דן").unwrap();
        assert!(invalidation.is_some());
        assert_eq!(store.selection().get(FilterKey::Agency), &FilterValue::Number(5));
        assert_eq!(store.active_label(FilterKey::Agency), Some("דן"));
        assert_eq!(store.select_by_label(FilterKey::Agency, "מטרופולין").unwrap(), None);
    }
}
