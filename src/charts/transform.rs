//! Chart data transformers
//!
//! Each transformer turns the raw rows of one dataset into a chart series.
//! Rows are decoded leniently: numbers may arrive as strings, missing or
//! malformed numeric fields count as zero, and rows that are not objects
//! are skipped with a warning.

use super::labels::{bucket_label, sort_by_hour};
use super::series::{ChartKind, ChartOptions, ChartRow, ChartSeries, ChartTable, LegendPosition};
use crate::filters::GroupBy;
use crate::reporting::{Dataset, DatasetBatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Chart titles; also the identities used by the chart preferences
pub mod titles {
    pub const PLAN_VS_PERFORMANCE: &str = "תכנון / ביצוע";
    pub const PERFORMANCE_PERCENTAGE: &str = "אחוז ביצוע";
    pub const PLANNED_CHANGES: &str = "שינויים מתוכננים";
    pub const PLANNED_TRIPS: &str = "סוג נסיעות מתוכנן";
    pub const HOURLY_DELAYS: &str = "איחורים / הקדמות לפי שעות";
    pub const PERIOD_DELAYS: &str = "איחורים / הקדמות לתקופה";
    pub const LINE_PERFORMANCE: &str = "ביצוע לפי קו";
}

const DATES_AXIS: &str = "תאיריכים";
const MONTH_COLUMN: &str = "חודש";

/// Planned-change categories, in column order
const CHANGE_CATEGORIES: [(&str, &str); 4] = [
    ("Times", "זמנים"),
    ("Weekly", "שבועי"),
    ("Daily", "יומי"),
    ("Stops", "תחנות"),
];

/// Delay buckets of the period summary, in display order
const DELAY_BUCKETS: [&str; 7] = [
    "הקדמה 3 דקות ומעלה",
    "הקדמה עד 2 דקות",
    "עד 5 דקות",
    "6-10 דקות",
    "11-20 דקות",
    "מעל 20 דקות",
    "לא בוצע",
];

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Time bucket fields; the service names the bucket differently per endpoint
#[derive(Debug, Default, Deserialize)]
struct Bucket {
    #[serde(rename = "GroupBy", default, deserialize_with = "text")]
    group_by: Option<String>,
    #[serde(rename = "Month", default, deserialize_with = "text")]
    month: Option<String>,
    #[serde(rename = "Date", default, deserialize_with = "text")]
    date: Option<String>,
}

impl Bucket {
    /// First non-blank of `GroupBy`, `Month`, `Date`
    fn raw(&self) -> Option<&str> {
        [&self.group_by, &self.month, &self.date]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct PlanVsPerformanceRow {
    #[serde(flatten)]
    bucket: Bucket,
    #[serde(rename = "Perfomerd", default, deserialize_with = "number")]
    performed: f64,
    #[serde(rename = "Planned", default, deserialize_with = "number")]
    planned: f64,
}

#[derive(Debug, Deserialize)]
struct PercentageRow {
    #[serde(flatten)]
    bucket: Bucket,
    #[serde(rename = "PerformancePercentage", default, deserialize_with = "number")]
    percentage: f64,
}

#[derive(Debug, Deserialize)]
struct PlannedTripsRow {
    #[serde(flatten)]
    bucket: Bucket,
    #[serde(rename = "City", default, deserialize_with = "number")]
    city: f64,
    #[serde(rename = "InterCity", default, deserialize_with = "number")]
    inter_city: f64,
}

#[derive(Debug, Deserialize)]
struct PlannedChangeRow {
    #[serde(flatten)]
    bucket: Bucket,
    #[serde(rename = "CombinedCategory", default, deserialize_with = "text")]
    category: Option<String>,
    #[serde(rename = "Amount", default, deserialize_with = "number")]
    amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TripPerformanceRow {
    #[serde(flatten)]
    bucket: Bucket,
    #[serde(default, deserialize_with = "number")]
    on_time: f64,
    #[serde(default, deserialize_with = "number")]
    early_up_to2_minutes: f64,
    #[serde(default, deserialize_with = "number")]
    early_more_than2_minutes: f64,
    #[serde(default, deserialize_with = "number")]
    late_up_to5_minutes: f64,
    #[serde(default, deserialize_with = "number")]
    late6_to10_minutes: f64,
    #[serde(default, deserialize_with = "number")]
    late11_to20_minutes: f64,
    #[serde(default, deserialize_with = "number")]
    late_over20_minutes: f64,
    #[serde(rename = "UnPerformed", default, deserialize_with = "number")]
    un_performed: f64,
}

impl TripPerformanceRow {
    /// Values in `DELAY_BUCKETS` order
    fn delay_buckets(&self) -> [f64; 7] {
        [
            self.early_more_than2_minutes,
            self.early_up_to2_minutes,
            self.late_up_to5_minutes,
            self.late6_to10_minutes,
            self.late11_to20_minutes,
            self.late_over20_minutes,
            self.un_performed,
        ]
    }
}

#[derive(Debug, Deserialize)]
struct LinePerformanceRow {
    #[serde(rename = "RouteNumber", default, deserialize_with = "text")]
    route_number: Option<String>,
    #[serde(rename = "LineID", alias = "LineId", default, deserialize_with = "text")]
    line_id: Option<String>,
    #[serde(rename = "LineName", default, deserialize_with = "text")]
    line_name: Option<String>,
    #[serde(rename = "Planned", default, deserialize_with = "number")]
    planned: f64,
    #[serde(rename = "Perfomerd", default, deserialize_with = "number")]
    performed: f64,
    #[serde(rename = "PerformancePercentage", default, deserialize_with = "number")]
    percentage: f64,
}

impl LinePerformanceRow {
    fn label(&self) -> String {
        [&self.route_number, &self.line_id, &self.line_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(super::labels::MISSING_LABEL)
            .to_string()
    }
}

fn decode<T: DeserializeOwned>(dataset: Dataset, rows: &[Value]) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match T::deserialize(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect()
}

/// Build a time-bucketed table; hourly buckets are ordered by hour of day
fn time_table<T>(
    header: &[&str],
    mut rows: Vec<T>,
    group_by: GroupBy,
    bucket: impl Fn(&T) -> &Bucket,
    values: impl Fn(&T) -> Vec<f64>,
) -> ChartTable {
    if group_by == GroupBy::Hour {
        sort_by_hour(&mut rows, |row| bucket(row).raw());
    }

    let mut table = ChartTable::new(header);
    for row in &rows {
        table.push(ChartRow::new(bucket_label(bucket(row).raw(), group_by), values(row)));
    }
    table
}

/// Planned vs performed trips per bucket
pub fn plan_vs_performance(rows: &[Value], group_by: GroupBy) -> ChartSeries {
    let decoded: Vec<PlanVsPerformanceRow> = decode(Dataset::PlanVsPerformance, rows);
    let table = time_table(
        &[MONTH_COLUMN, "בוצע", "מתוכנן"],
        decoded,
        group_by,
        |r| &r.bucket,
        |r| vec![r.performed, r.planned],
    );

    ChartSeries::new(
        titles::PLAN_VS_PERFORMANCE,
        ChartKind::Line,
        table,
        ChartOptions::timeline(DATES_AXIS, "נסיעות").rtl().point_size(5),
    )
}

/// Performance percentage per bucket, on a 0-100 axis
pub fn performance_percentage(rows: &[Value], group_by: GroupBy) -> ChartSeries {
    let decoded: Vec<PercentageRow> = decode(Dataset::PerformancePercentage, rows);
    let table = time_table(
        &[MONTH_COLUMN, titles::PERFORMANCE_PERCENTAGE],
        decoded,
        group_by,
        |r| &r.bucket,
        |r| vec![r.percentage],
    );

    let mut options = ChartOptions::timeline(DATES_AXIS, "אחוזים").point_size(5);
    options.v_axis.format = Some("#'%'".to_string());
    options.v_axis.min = Some(0.0);
    options.v_axis.max = Some(100.0);

    ChartSeries::new(titles::PERFORMANCE_PERCENTAGE, ChartKind::Line, table, options)
}

/// Planned changes per bucket, one column per change category
///
/// Buckets keep first-seen order; categories absent from a bucket are zero.
pub fn planned_changes(rows: &[Value], group_by: GroupBy) -> ChartSeries {
    let decoded: Vec<PlannedChangeRow> = decode(Dataset::PlannedChanges, rows);

    let mut groups: Vec<(Bucket, [f64; 4])> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();

    for row in decoded {
        let key = row.bucket.raw().map(str::to_string);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((Bucket::default(), [0.0; 4]));
            groups.len() - 1
        });
        if groups[slot].0.raw().is_none() {
            groups[slot].0 = row.bucket;
        }

        match CHANGE_CATEGORIES
            .iter()
            .position(|(name, _)| row.category.as_deref() == Some(*name))
        {
            Some(column) => groups[slot].1[column] += row.amount,
            None => tracing::warn!(category = ?row.category, "Unknown planned-change category"),
        }
    }

    let mut header = vec![MONTH_COLUMN];
    header.extend(CHANGE_CATEGORIES.iter().map(|(_, label)| *label));

    let table = time_table(&header, groups, group_by, |g| &g.0, |g| g.1.to_vec());

    ChartSeries::new(
        titles::PLANNED_CHANGES,
        ChartKind::Line,
        table,
        ChartOptions::timeline(DATES_AXIS, "כמות שינויים").point_size(5),
    )
}

/// Planned urban and intercity trips per bucket
pub fn planned_trips(rows: &[Value], group_by: GroupBy) -> ChartSeries {
    let decoded: Vec<PlannedTripsRow> = decode(Dataset::PlannedTrips, rows);
    let table = time_table(
        &[MONTH_COLUMN, "עירוני", "בינעירוני"],
        decoded,
        group_by,
        |r| &r.bucket,
        |r| vec![r.city, r.inter_city],
    );

    ChartSeries::new(
        titles::PLANNED_TRIPS,
        ChartKind::Line,
        table,
        ChartOptions::timeline(DATES_AXIS, "כמות נסיעות").point_size(5),
    )
}

/// Early/late distribution per hour; only meaningful for single-day ranges
fn hourly_delays(decoded: &[TripPerformanceRow]) -> ChartSeries {
    let mut ordered: Vec<&TripPerformanceRow> = decoded.iter().collect();
    sort_by_hour(&mut ordered, |row| row.bucket.raw());

    let mut table = ChartTable::new(&[
        "שעה",
        "בזמן",
        "הקדמה עד 2 דקות",
        "הקדמה 3 דקות ומעלה",
        "עד 5 דקות",
        "6-10 דקות",
        "11-20 דקות",
        "מעל 20 דקות",
        "לא בוצע",
    ]);
    for row in ordered {
        table.push(ChartRow::new(
            bucket_label(row.bucket.raw(), GroupBy::Hour),
            vec![
                row.on_time,
                row.early_up_to2_minutes,
                row.early_more_than2_minutes,
                row.late_up_to5_minutes,
                row.late6_to10_minutes,
                row.late11_to20_minutes,
                row.late_over20_minutes,
                row.un_performed,
            ],
        ));
    }

    ChartSeries::new(
        titles::HOURLY_DELAYS,
        ChartKind::Column,
        table,
        ChartOptions::timeline("שעות", "כמות נסיעות").stacked(),
    )
}

/// Period totals per delay bucket; every bucket is present, zero if unseen
fn period_delays(decoded: &[TripPerformanceRow]) -> ChartSeries {
    let mut totals = [0.0; 7];
    for row in decoded {
        for (total, value) in totals.iter_mut().zip(row.delay_buckets()) {
            *total += value;
        }
    }

    let mut table = ChartTable::new(&["קטגוריה", "ערך"]);
    for (label, total) in DELAY_BUCKETS.iter().zip(totals) {
        table.push(ChartRow::new(*label, vec![total]));
    }

    ChartSeries::new(
        titles::PERIOD_DELAYS,
        ChartKind::Area,
        table,
        ChartOptions::full_area(),
    )
}

/// Delay charts: the hourly distribution (single-day ranges only) and the
/// period summary
pub fn trip_performance(rows: &[Value], group_by: GroupBy) -> Vec<ChartSeries> {
    let decoded: Vec<TripPerformanceRow> = decode(Dataset::TripPerformanceDetails, rows);

    let mut charts = Vec::with_capacity(2);
    if group_by == GroupBy::Hour {
        charts.push(hourly_delays(&decoded));
    }
    charts.push(period_delays(&decoded));
    charts
}

/// Planned and performed trips per line, in service order
pub fn line_performance(rows: &[Value]) -> ChartSeries {
    let decoded: Vec<LinePerformanceRow> = decode(Dataset::LinePerformanceDetails, rows);

    let mut table = ChartTable::new(&["קו", "מתוכנן", "בוצע", titles::PERFORMANCE_PERCENTAGE]);
    for row in &decoded {
        table.push(ChartRow::new(
            row.label(),
            vec![row.planned, row.performed, row.percentage],
        ));
    }

    ChartSeries::new(
        titles::LINE_PERFORMANCE,
        ChartKind::Table,
        table,
        ChartOptions {
            legend: LegendPosition::None,
            ..Default::default()
        },
    )
}

/// Turn a settled batch into chart series
///
/// Datasets that failed or returned no rows produce no chart.
pub fn transform_batch(batch: &DatasetBatch, group_by: GroupBy) -> Vec<ChartSeries> {
    let rows = |dataset| batch.rows(dataset).filter(|rows| !rows.is_empty());
    let mut charts = Vec::new();

    if let Some(rows) = rows(Dataset::PlanVsPerformance) {
        charts.push(plan_vs_performance(rows, group_by));
    }
    if let Some(rows) = rows(Dataset::PerformancePercentage) {
        charts.push(performance_percentage(rows, group_by));
    }
    if let Some(rows) = rows(Dataset::PlannedChanges) {
        charts.push(planned_changes(rows, group_by));
    }
    if let Some(rows) = rows(Dataset::PlannedTrips) {
        charts.push(planned_trips(rows, group_by));
    }
    if let Some(rows) = rows(Dataset::TripPerformanceDetails) {
        charts.extend(trip_performance(rows, group_by));
    }
    if let Some(rows) = rows(Dataset::LinePerformanceDetails) {
        charts.push(line_performance(rows));
    }

    charts
}
