//! Chart-ready series
//!
//! A `ChartSeries` is a title, a row-oriented table (header + labeled numeric
//! rows) and a rendering configuration. Its serialized form is what chart
//! widgets consume: `{data: [header, ...rows], options, type, title}`.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Kind of chart widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Line,
    Column,
    Area,
    Table,
}

/// Legend placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    Left,
    None,
}

/// Text direction of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    Rtl,
    #[default]
    Ltr,
}

/// Axis configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axis {
    pub title: Option<String>,
    /// Number format, e.g. `#'%'`
    pub format: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub slanted: bool,
    /// Categories run right-to-left
    pub reversed: bool,
}

impl Axis {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    /// Category axis of a time chart
    pub fn timeline(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            slanted: true,
            reversed: true,
            ..Default::default()
        }
    }

    /// No setting differs from the widget defaults
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub h_axis: Axis,
    pub v_axis: Axis,
    pub stacked: bool,
    pub legend: LegendPosition,
    pub direction: TextDirection,
    /// Marker size applied to every series
    pub point_size: Option<u32>,
    /// Chart area as (width %, height %)
    pub area: (u8, u8),
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            h_axis: Axis::default(),
            v_axis: Axis::default(),
            stacked: false,
            legend: LegendPosition::Top,
            direction: TextDirection::Ltr,
            point_size: None,
            area: (80, 60),
        }
    }
}

impl ChartOptions {
    /// Options for a chart over time buckets
    pub fn timeline(h_title: &str, v_title: &str) -> Self {
        Self {
            h_axis: Axis::timeline(h_title),
            v_axis: Axis::titled(v_title),
            ..Default::default()
        }
    }

    /// Axis-less chart filling its box, legend on the left
    pub fn full_area() -> Self {
        Self {
            legend: LegendPosition::Left,
            area: (100, 100),
            ..Default::default()
        }
    }

    pub fn rtl(mut self) -> Self {
        self.direction = TextDirection::Rtl;
        self
    }

    pub fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }

    pub fn point_size(mut self, size: u32) -> Self {
        self.point_size = Some(size);
        self
    }

    fn wire(&self, series_count: usize) -> OptionsWire<'_> {
        let alignment = (self.legend == LegendPosition::Top).then_some("center");
        let series = match self.point_size {
            Some(point_size) => (0..series_count)
                .map(|i| (i, PointSizeWire { point_size }))
                .collect(),
            None => BTreeMap::new(),
        };

        OptionsWire {
            chart_area: ChartAreaWire {
                width: format!("{}%", self.area.0),
                height: format!("{}%", self.area.1),
            },
            rtl: self.direction == TextDirection::Rtl,
            h_axis: AxisWire::from_axis(&self.h_axis),
            v_axis: AxisWire::from_axis(&self.v_axis),
            legend: LegendWire {
                position: self.legend,
                alignment,
            },
            series,
            is_stacked: self.stacked,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AxisWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<i8>,
    #[serde(skip_serializing_if = "is_false")]
    slanted_text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
}

impl<'a> AxisWire<'a> {
    fn from_axis(axis: &'a Axis) -> Option<Self> {
        if axis.is_empty() {
            return None;
        }
        Some(Self {
            title: axis.title.as_deref(),
            direction: axis.reversed.then_some(-1),
            slanted_text: axis.slanted,
            format: axis.format.as_deref(),
            min_value: axis.min,
            max_value: axis.max,
        })
    }
}

#[derive(Serialize)]
struct ChartAreaWire {
    width: String,
    height: String,
}

#[derive(Serialize)]
struct LegendWire {
    position: LegendPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    alignment: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointSizeWire {
    point_size: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsWire<'a> {
    chart_area: ChartAreaWire,
    #[serde(skip_serializing_if = "is_false")]
    rtl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    h_axis: Option<AxisWire<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    v_axis: Option<AxisWire<'a>>,
    legend: LegendWire,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    series: BTreeMap<usize, PointSizeWire>,
    is_stacked: bool,
}

/// One labeled body row
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl ChartRow {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Header row plus body rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartTable {
    pub header: Vec<String>,
    pub rows: Vec<ChartRow>,
}

impl ChartTable {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ChartRow) {
        self.rows.push(row);
    }

    /// Row by label
    pub fn row(&self, label: &str) -> Option<&ChartRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    fn wire(&self) -> Vec<Vec<CellWire<'_>>> {
        let mut data = Vec::with_capacity(self.rows.len() + 1);
        data.push(self.header.iter().map(|h| CellWire::Text(h.as_str())).collect());
        for row in &self.rows {
            let mut cells = Vec::with_capacity(row.values.len() + 1);
            cells.push(CellWire::Text(&row.label));
            cells.extend(row.values.iter().map(|v| CellWire::Number(finite(*v))));
            data.push(cells);
        }
        data
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum CellWire<'a> {
    Text(&'a str),
    Number(f64),
}

/// Renderers need well-defined numbers
fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A chart ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Stable identity, also used by the chart preferences
    pub title: String,
    pub kind: ChartKind,
    pub table: ChartTable,
    pub options: ChartOptions,
}

impl ChartSeries {
    pub fn new(title: &str, kind: ChartKind, table: ChartTable, options: ChartOptions) -> Self {
        Self {
            title: title.to_string(),
            kind,
            table,
            options,
        }
    }
}

#[derive(Serialize)]
struct SeriesWire<'a> {
    data: Vec<Vec<CellWire<'a>>>,
    options: OptionsWire<'a>,
    #[serde(rename = "type")]
    kind: ChartKind,
    title: &'a str,
}

impl Serialize for ChartSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let series_count = self.table.header.len().saturating_sub(1);
        SeriesWire {
            data: self.table.wire(),
            options: self.options.wire(series_count),
            kind: self.kind,
            title: &self.title,
        }
        .serialize(serializer)
    }
}
