//! Filter option records
//!
//! The reporting service names the label and value fields of option records
//! differently for every filter, and names the filters themselves differently
//! in option requests and in dataset requests. All of that lives in one table.

use super::types::FilterKey;
use serde::Serialize;
use serde_json::Value;

/// Server-side field names for one filter
#[derive(Debug)]
pub struct FieldMapping {
    pub key: FilterKey,
    /// `SelectChoice` sent when requesting this filter's options
    pub select_choice: &'static str,
    /// Field carrying this filter's selection in option requests
    pub request_field: &'static str,
    /// Field carrying this filter's selection in dataset requests
    pub dataset_field: &'static str,
    /// Option record field displayed to the user
    pub label_field: &'static str,
    /// Option record field stored as the selection
    pub value_field: &'static str,
    /// Field that, when present, overrides both label and value
    pub preferred_field: Option<&'static str>,
    /// Selections are sent as integers
    pub numeric: bool,
}

/// Indexed by `FilterKey::index()`
static MAPPINGS: [FieldMapping; 7] = [
    FieldMapping {
        key: FilterKey::Agency,
        select_choice: "Agency",
        request_field: "AgencyId",
        dataset_field: "AgencyId",
        label_field: "agency_name",
        value_field: "agency_id",
        preferred_field: None,
        numeric: true,
    },
    FieldMapping {
        key: FilterKey::Cluster,
        select_choice: "Cluster",
        request_field: "ClusterId",
        dataset_field: "ClusterId",
        label_field: "ClusterName",
        value_field: "Clusterid",
        preferred_field: None,
        numeric: true,
    },
    FieldMapping {
        key: FilterKey::SubCluster,
        select_choice: "SubCluster",
        request_field: "SubCluster",
        dataset_field: "SubCluster",
        label_field: "SubCluster",
        value_field: "SubCluster",
        preferred_field: Some("ClusterSubDesc"),
        numeric: false,
    },
    FieldMapping {
        key: FilterKey::City,
        select_choice: "Cities",
        request_field: "City",
        dataset_field: "City",
        label_field: "CityName",
        value_field: "CityName",
        preferred_field: None,
        numeric: false,
    },
    FieldMapping {
        key: FilterKey::RouteNumber,
        select_choice: "LineID",
        request_field: "LineID",
        dataset_field: "LineId",
        label_field: "RouteNumber",
        value_field: "LineID",
        preferred_field: None,
        numeric: false,
    },
    FieldMapping {
        key: FilterKey::LineType,
        select_choice: "LineType",
        request_field: "LineType",
        dataset_field: "LineType",
        label_field: "LineType",
        value_field: "LineType",
        preferred_field: None,
        numeric: false,
    },
    FieldMapping {
        key: FilterKey::LineGroup,
        select_choice: "linegroup",
        request_field: "linegroup",
        dataset_field: "linegroup",
        label_field: "descrip",
        value_field: "id",
        preferred_field: None,
        numeric: true,
    },
];

/// Field names for `key`
pub fn mapping(key: FilterKey) -> &'static FieldMapping {
    &MAPPINGS[key.index()]
}

/// One selectable option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    /// Text shown to the user
    pub label: String,
    /// Value stored in the selection when chosen
    pub value: String,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Build an option from a raw server record using the field table
    pub fn from_record(key: FilterKey, record: &Value) -> Self {
        let fields = mapping(key);

        if let Some(preferred) = fields.preferred_field {
            if let Some(value) = record.get(preferred).filter(|v| !v.is_null()) {
                let text = render(value);
                return Self::new(text.clone(), text);
            }
        }

        Self::new(
            extract(record, fields.label_field),
            extract(record, fields.value_field),
        )
    }
}

/// Convert raw records into options, dropping records with no usable value
pub fn parse_options(key: FilterKey, records: &[Value]) -> Vec<FilterOption> {
    records
        .iter()
        .map(|r| FilterOption::from_record(key, r))
        .filter(|o| !o.value.is_empty() || !o.label.is_empty())
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// The named field, else a generic `value` field, else the first field,
/// else the record itself
fn extract(record: &Value, field: &str) -> String {
    match record {
        Value::Object(map) => map
            .get(field)
            .filter(|v| !is_blank(v))
            .or_else(|| map.get("value").filter(|v| !is_blank(v)))
            .or_else(|| map.values().next())
            .map(render)
            .unwrap_or_default(),
        other => render(other),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.first().map(render).unwrap_or_default(),
        Value::Object(map) => map.values().next().map(render).unwrap_or_default(),
    }
}
