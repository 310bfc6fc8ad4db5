//! Request/response shapes for the reporting service
//!
//! Every request is a POST of `{userName, password, data}`. Option requests
//! carry the target filter as `SelectChoice` plus the scoping selections;
//! dataset requests carry the full `ApiFilters` projection.

use super::error::{ReportingError, ReportingResult};
use crate::filters::{
    mapping, parse_options, EmptyReason, FilterKey, FilterSelection, FilterValue, GroupBy,
    OptionState,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Message the service returns for a successful request with no records
pub const SUCCESS_MESSAGE: &str = "הפעולה הצליחה";

/// Spellings of the "user has no line groups" error message
pub const NO_LINE_GROUPS_MESSAGES: [&str; 2] =
    ["אין למשתמש קבוצות קוים", "אין למשתמש קבוצות קווים"];

/// HTTP status the service uses for the "no line groups" condition
pub const NO_LINE_GROUPS_STATUS: u16 = 406;

/// Authenticated request envelope
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T> {
    #[serde(rename = "userName")]
    pub user_name: &'a str,
    pub password: &'a str,
    pub data: T,
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Request for one filter's option list
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsRequest {
    pub target: FilterKey,
    /// Scoping selections: shallower filters only, target excluded
    pub filters: Vec<(FilterKey, FilterValue)>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl OptionsRequest {
    pub fn from_selection(target: FilterKey, selection: &FilterSelection) -> Self {
        Self {
            target,
            filters: selection
                .scoped_for(target)
                .map(|(k, v)| (k, v.clone()))
                .collect(),
            start_date: selection.start_date(),
            end_date: selection.end_date(),
        }
    }

    /// The `data` object of the request
    pub fn payload(&self, user_id: &str) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("UserId".into(), Value::from(user_id));
        data.insert(
            "SelectChoice".into(),
            Value::from(mapping(self.target).select_choice),
        );

        for (key, value) in &self.filters {
            if value.is_empty() {
                continue;
            }
            data.insert(mapping(*key).request_field.into(), filter_json(value));
        }

        if let Some(start) = self.start_date {
            data.insert("StartDate".into(), Value::from(format_date(start)));
        }
        if let Some(end) = self.end_date {
            data.insert("EndDate".into(), Value::from(format_date(end)));
        }

        data
    }
}

fn filter_json(value: &FilterValue) -> Value {
    match value {
        FilterValue::Empty => Value::from(""),
        FilterValue::Number(n) => Value::from(*n),
        FilterValue::Text(s) => Value::from(s.as_str()),
    }
}

/// Projection of the selection sent with every dataset request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFilters {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub group_by: GroupBy,
    pub filters: BTreeMap<FilterKey, FilterValue>,
}

impl ApiFilters {
    /// `None` while the date range is pending
    pub fn from_selection(selection: &FilterSelection) -> Option<Self> {
        let range = selection.date_range()?;
        Some(Self {
            start_date: range.start(),
            end_date: range.end(),
            group_by: range.group_by(),
            filters: selection.selected().map(|(k, v)| (k, v.clone())).collect(),
        })
    }

    /// The `data` object of a dataset request; unselected filters are sent
    /// as empty strings
    pub fn payload(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("startDate".into(), Value::from(format_date(self.start_date)));
        data.insert("endDate".into(), Value::from(format_date(self.end_date)));
        data.insert("groupBy".into(), Value::from(self.group_by.to_string()));

        for key in FilterKey::ALL {
            let value = self.filters.get(&key).map(filter_json).unwrap_or_else(|| Value::from(""));
            data.insert(mapping(key).dataset_field.into(), value);
        }

        data
    }
}

/// Classified answer to an option request
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsOutcome {
    Records(Vec<Value>),
    /// Successful request, nothing matched
    NoRecords,
    /// The user has no line groups
    NoLineGroups,
}

impl OptionsOutcome {
    /// Cache entry for `key`
    pub fn into_state(self, key: FilterKey) -> OptionState {
        match self {
            Self::Records(records) if records.is_empty() => {
                OptionState::ConfirmedEmpty(EmptyReason::NoRecords)
            }
            Self::Records(records) => OptionState::Loaded(parse_options(key, &records)),
            Self::NoRecords => OptionState::ConfirmedEmpty(EmptyReason::NoRecords),
            Self::NoLineGroups => OptionState::ConfirmedEmpty(EmptyReason::NoLineGroups),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(rename = "ResData")]
    res_data: Option<Vec<Value>>,
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "Msg")]
    msg: Option<String>,
    #[serde(rename = "ErrMsg")]
    err_msg: Option<String>,
}

fn parse_status_body(body: &str) -> StatusBody {
    serde_json::from_str(body).unwrap_or_default()
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Classify an option response by status code and body
pub fn classify_options_response(
    target: FilterKey,
    status: u16,
    body: &str,
) -> ReportingResult<OptionsOutcome> {
    let parsed = parse_status_body(body);

    if is_success(status) {
        if let Some(records) = parsed.res_data {
            return Ok(OptionsOutcome::Records(records));
        }
        if parsed.msg.as_deref() == Some(SUCCESS_MESSAGE) {
            return Ok(OptionsOutcome::NoRecords);
        }
        let message = parsed
            .msg
            .or(parsed.err_msg)
            .or(parsed.status)
            .unwrap_or_else(|| "unexpected response".to_string());
        return Err(ReportingError::Rejected(message));
    }

    let no_line_groups = parsed
        .err_msg
        .as_deref()
        .map(|m| NO_LINE_GROUPS_MESSAGES.contains(&m.trim()))
        .unwrap_or(false);
    if target == FilterKey::LineGroup && (status == NO_LINE_GROUPS_STATUS || no_line_groups) {
        return Ok(OptionsOutcome::NoLineGroups);
    }

    Err(ReportingError::ApiError {
        status,
        message: parsed
            .err_msg
            .or(parsed.msg)
            .unwrap_or_else(|| body.to_string()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetBody {
    Rows(Vec<Value>),
    Wrapped(StatusBody),
}

/// Parse the rows of a successful dataset response
///
/// The service answers either with a bare array or with `{ResData: [...]}`.
pub fn parse_dataset_body(body: &str) -> ReportingResult<Vec<Value>> {
    match serde_json::from_str::<DatasetBody>(body)? {
        DatasetBody::Rows(rows) => Ok(rows),
        DatasetBody::Wrapped(StatusBody {
            res_data: Some(rows),
            ..
        }) => Ok(rows),
        DatasetBody::Wrapped(StatusBody { msg: Some(m), .. }) if m == SUCCESS_MESSAGE => {
            Ok(Vec::new())
        }
        DatasetBody::Wrapped(other) => Err(ReportingError::Rejected(
            other
                .err_msg
                .or(other.msg)
                .unwrap_or_else(|| "unexpected response".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::DateRange;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn selection() -> FilterSelection {
        FilterSelection::new(DateRange::new(date(2025, 4, 1), date(2025, 4, 8)).unwrap())
    }

    #[test]
    fn test_options_payload() {
        let mut store = crate::filters::FilterStore::new(selection());
        store.set_filter(FilterKey::Agency, "3").unwrap();
        store.set_filter(FilterKey::Cluster, "12").unwrap();
        store.set_filter(FilterKey::LineType, "עירוני").unwrap();

        let request = OptionsRequest::from_selection(FilterKey::Cluster, store.selection());
        let payload = Value::Object(request.payload("42"));

        assert_eq!(
            payload,
            json!({
                "UserId": "42",
                "SelectChoice": "Cluster",
                "AgencyId": 3,
                "StartDate": "2025-04-01",
                "EndDate": "2025-04-08",
            })
        );
    }

    #[test]
    fn test_options_payload_uses_server_names() {
        let mut store = crate::filters::FilterStore::new(selection());
        store.set_filter(FilterKey::Agency, "3").unwrap();
        store.set_filter(FilterKey::City, "חיפה").unwrap();

        let request = OptionsRequest::from_selection(FilterKey::RouteNumber, store.selection());
        let payload = request.payload("42");
        assert_eq!(payload["SelectChoice"], json!("LineID"));
        assert_eq!(payload["City"], json!("חיפה"));

        let request = OptionsRequest::from_selection(FilterKey::City, store.selection());
        let payload = request.payload("42");
        assert_eq!(payload["SelectChoice"], json!("Cities"));
        assert!(payload.get("City").is_none());
    }

    #[test]
    fn test_dataset_payload() {
        let mut store = crate::filters::FilterStore::new(selection());
        store.set_filter(FilterKey::Agency, "3").unwrap();
        store.set_filter(FilterKey::SubCluster, "צפון").unwrap();
        store.set_filter(FilterKey::RouteNumber, "10480").unwrap();

        let filters = ApiFilters::from_selection(store.selection()).unwrap();
        assert_eq!(filters.group_by, GroupBy::Day);

        let payload = Value::Object(filters.payload());
        assert_eq!(
            payload,
            json!({
                "startDate": "2025-04-01",
                "endDate": "2025-04-08",
                "groupBy": "DAY",
                "AgencyId": 3,
                "ClusterId": "",
                "SubCluster": "צפון",
                "City": "",
                "LineId": "10480",
                "LineType": "",
                "linegroup": "",
            })
        );
    }

    #[test]
    fn test_api_filters_pending() {
        let mut pending = selection();
        pending.set_dates(Some(date(2025, 4, 1)), None);
        assert!(ApiFilters::from_selection(&pending).is_none());
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope {
            user_name: "ops",
            password: "secret",
            data: json!({"a": 1}),
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"userName": "ops", "password": "secret", "data": {"a": 1}})
        );
    }

    #[test]
    fn test_classify_records() {
        let body = r#"{"ResData":[{"agency_id":3,"agency_name":"אגד"}]}"#;
        let outcome = classify_options_response(FilterKey::Agency, 200, body).unwrap();
        assert!(matches!(outcome, OptionsOutcome::Records(ref r) if r.len() == 1));
    }

    #[test]
    fn test_classify_success_without_records() {
        let body = json!({"Status": "OK", "Msg": SUCCESS_MESSAGE}).to_string();
        let outcome = classify_options_response(FilterKey::City, 200, &body).unwrap();
        assert_eq!(outcome, OptionsOutcome::NoRecords);
    }

    #[test]
    fn test_classify_rejected_payload() {
        let body = r#"{"Status":"ERR","Msg":"bad user"}"#;
        let err = classify_options_response(FilterKey::City, 200, body).unwrap_err();
        assert!(matches!(err, ReportingError::Rejected(ref m) if m == "bad user"));
    }

    #[test]
    fn test_classify_no_line_groups() {
        let body = json!({"ErrMsg": NO_LINE_GROUPS_MESSAGES[0], "Status": "ERR"}).to_string();
        let outcome = classify_options_response(FilterKey::LineGroup, 406, &body).unwrap();
        assert_eq!(outcome, OptionsOutcome::NoLineGroups);

        let body = json!({"ErrMsg": NO_LINE_GROUPS_MESSAGES[1]}).to_string();
        let outcome = classify_options_response(FilterKey::LineGroup, 400, &body).unwrap();
        assert_eq!(outcome, OptionsOutcome::NoLineGroups);
    }

    #[test]
    fn test_no_line_groups_only_applies_to_line_group() {
        let body = json!({"ErrMsg": "not acceptable"}).to_string();
        let err = classify_options_response(FilterKey::Cluster, 406, &body).unwrap_err();
        assert!(matches!(err, ReportingError::ApiError { status: 406, .. }));
    }

    #[test]
    fn test_server_error_is_not_empty() {
        let err = classify_options_response(FilterKey::LineGroup, 500, "oops").unwrap_err();
        assert!(matches!(err, ReportingError::ApiError { status: 500, ref message } if message == "oops"));
    }

    #[test]
    fn test_outcome_into_state() {
        assert_eq!(
            OptionsOutcome::NoLineGroups.into_state(FilterKey::LineGroup),
            OptionState::ConfirmedEmpty(EmptyReason::NoLineGroups)
        );
        assert_eq!(
            OptionsOutcome::Records(vec![]).into_state(FilterKey::City),
            OptionState::ConfirmedEmpty(EmptyReason::NoRecords)
        );
        let state = OptionsOutcome::Records(vec![json!({"CityName": "עכו"})]).into_state(FilterKey::City);
        assert_eq!(state.options().len(), 1);
    }

    #[test]
    fn test_parse_dataset_body() {
        assert_eq!(parse_dataset_body(r#"[{"Planned":1}]"#).unwrap().len(), 1);
        assert_eq!(parse_dataset_body(r#"{"ResData":[{},{}]}"#).unwrap().len(), 2);

        let empty = json!({"Status": "OK", "Msg": SUCCESS_MESSAGE}).to_string();
        assert!(parse_dataset_body(&empty).unwrap().is_empty());

        assert!(matches!(
            parse_dataset_body(r#"{"ErrMsg":"denied"}"#),
            Err(ReportingError::Rejected(_))
        ));
        assert!(matches!(parse_dataset_body("<html>"), Err(ReportingError::Decode(_))));
    }
}
