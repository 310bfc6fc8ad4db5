//! Time bucket labels
//!
//! Daily buckets arrive as `YYYY-MM-DD...` and render as `DD.MM`. Hourly
//! buckets end in a 12-hour clock token (`1:00PM`) that becomes both the
//! label and the sort key.

use crate::filters::GroupBy;
use chrono::{NaiveDate, NaiveTime, Timelike};

/// Label used when a row carries no bucket value
pub const MISSING_LABEL: &str = "N/A";

/// Trailing `H:MM{AM|PM}` token of a bucket value
pub fn hour_token(raw: &str) -> Option<&str> {
    let token = raw.split_whitespace().last()?;
    let upper = token.to_ascii_uppercase();
    if (upper.ends_with("AM") || upper.ends_with("PM")) && token.contains(':') {
        Some(token)
    } else {
        None
    }
}

/// Minutes since midnight of an hourly bucket value
///
/// `12AM` is midnight, `12PM` is noon, other `PM` hours add twelve.
pub fn hour_ordinal(raw: &str) -> Option<u32> {
    let token = hour_token(raw)?;
    let time = NaiveTime::parse_from_str(&token.to_ascii_uppercase(), "%I:%M%p").ok()?;
    Some(time.hour() * 60 + time.minute())
}

/// Display label of a bucket value
pub fn bucket_label(raw: Option<&str>, group_by: GroupBy) -> String {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return MISSING_LABEL.to_string(),
    };

    if group_by == GroupBy::Hour {
        if let Some(token) = hour_token(raw) {
            return token.to_string();
        }
    }

    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|date| date.format("%d.%m").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Stable-sort rows by hour of day; unparseable buckets go last
pub fn sort_by_hour<T>(rows: &mut [T], bucket: impl Fn(&T) -> Option<&str>) {
    rows.sort_by_key(|row| bucket(row).and_then(hour_ordinal).unwrap_or(u32::MAX));
}
