//! Core filter types
//!
//! - `FilterKey`: the seven categorical dimensions a report can be narrowed by
//! - `FilterValue`: a selected id or text, or nothing
//! - `DateRange` and `GroupBy`: the reporting window and its derived bucketing
//! - `FilterSelection`: everything currently chosen

use super::error::{FilterError, FilterResult};
use super::hierarchy;
use chrono::{Duration, Local, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Categorical filter dimension
///
/// Variants are declared in hierarchy order, so the derived `Ord` sorts
/// parents before their dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKey {
    Agency,
    Cluster,
    SubCluster,
    City,
    RouteNumber,
    LineType,
    LineGroup,
}

impl FilterKey {
    /// All keys in hierarchy order
    pub const ALL: [FilterKey; 7] = [
        FilterKey::Agency,
        FilterKey::Cluster,
        FilterKey::SubCluster,
        FilterKey::City,
        FilterKey::RouteNumber,
        FilterKey::LineType,
        FilterKey::LineGroup,
    ];

    /// Position in `ALL`, used to index the static tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Self::Agency => "Agency",
            Self::Cluster => "Cluster",
            Self::SubCluster => "SubCluster",
            Self::City => "City",
            Self::RouteNumber => "RouteNumber",
            Self::LineType => "LineType",
            Self::LineGroup => "LineGroup",
        }
    }
}

impl std::fmt::Display for FilterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "agency" => Ok(Self::Agency),
            "cluster" => Ok(Self::Cluster),
            "subcluster" => Ok(Self::SubCluster),
            "city" | "cities" => Ok(Self::City),
            "routenumber" | "route" | "lineid" => Ok(Self::RouteNumber),
            "linetype" => Ok(Self::LineType),
            "linegroup" => Ok(Self::LineGroup),
            _ => Err(FilterError::UnknownFilter(s.to_string())),
        }
    }
}

/// A selected filter value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    /// Nothing selected
    #[default]
    Empty,
    /// Numeric server id (agency, cluster, line group)
    Number(i64),
    /// Free-form value (city name, route id, ...)
    Text(String),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Value as the string the option records carry
    pub fn as_option_value(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_str(""),
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Temporal bucketing of chart datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupBy {
    Hour,
    Day,
}

impl GroupBy {
    /// `Hour` for a single calendar day, `Day` otherwise
    pub fn for_range(start: NaiveDate, end: NaiveDate) -> Self {
        if start == end {
            Self::Hour
        } else {
            Self::Day
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour => write!(f, "HOUR"),
            Self::Day => write!(f, "DAY"),
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting an end before the start
    pub fn new(start: NaiveDate, end: NaiveDate) -> FilterResult<Self> {
        if end < start {
            return Err(FilterError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering one day
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// `days` days before `today` through `today`
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn group_by(&self) -> GroupBy {
        GroupBy::for_range(self.start, self.end)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::last_days(Local::now().date_naive(), 7)
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> FilterResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| FilterError::InvalidDate(s.to_string()))
}

static EMPTY: FilterValue = FilterValue::Empty;

/// Current filter selection plus the date window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    values: BTreeMap<FilterKey, FilterValue>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl FilterSelection {
    /// Empty categorical filters over the given range
    pub fn new(range: DateRange) -> Self {
        Self {
            values: BTreeMap::new(),
            start_date: Some(range.start),
            end_date: Some(range.end),
        }
    }

    pub fn get(&self, key: FilterKey) -> &FilterValue {
        self.values.get(&key).unwrap_or(&EMPTY)
    }

    pub(crate) fn set(&mut self, key: FilterKey, value: FilterValue) {
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub(crate) fn clear(&mut self, key: FilterKey) {
        self.values.remove(&key);
    }

    pub(crate) fn clear_categorical(&mut self) {
        self.values.clear();
    }

    /// Non-empty selections in hierarchy order
    pub fn selected(&self) -> impl Iterator<Item = (FilterKey, &FilterValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Selections that scope an option request for `target`: everything at
    /// the same depth or shallower, excluding the target itself
    pub fn scoped_for(&self, target: FilterKey) -> impl Iterator<Item = (FilterKey, &FilterValue)> {
        let max_depth = hierarchy::depth(target);
        self.selected()
            .filter(move |(k, _)| *k != target && hierarchy::depth(*k) <= max_depth)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub(crate) fn set_dates(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.start_date = start;
        self.end_date = end;
    }

    /// Complete range, or `None` while a bound is still missing
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => DateRange::new(start, end).ok(),
            _ => None,
        }
    }

    /// A range with only one bound is pending
    pub fn is_pending(&self) -> bool {
        self.date_range().is_none()
    }

    /// Derived bucketing; never set directly
    pub fn group_by(&self) -> Option<GroupBy> {
        self.date_range().map(|r| r.group_by())
    }
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self::new(DateRange::default())
    }
}
