//! Chart Data Transformers
//!
//! Raw dataset rows become chart-ready series: a header row, labeled numeric
//! rows, and rendering options.

mod labels;
mod series;
pub mod transform;

pub use labels::{bucket_label, hour_ordinal, hour_token, sort_by_hour, MISSING_LABEL};
pub use series::{
    Axis, ChartKind, ChartOptions, ChartRow, ChartSeries, ChartTable, LegendPosition,
    TextDirection,
};
pub use transform::{titles, transform_batch};
