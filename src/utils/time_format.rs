use crate::models::Record;
use crate::utils::text::display_value;
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

const UTC8_OFFSET_SECS: i32 = 8 * 3_600;
const NOT_AVAILABLE: &str = "N/A";

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Milliseconds since the epoch from a number or a numeric string.
pub fn value_as_millis(value: &Value) -> Option<i64> {
    let millis = match value {
        Value::Number(n) => n.as_i64().map(|v| v as f64).or_else(|| n.as_f64())?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    Some(millis.trunc() as i64)
}

fn utc_datetime(value: &Value) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value_as_millis(value)?).single()
}

fn utc8() -> FixedOffset {
    FixedOffset::east_opt(UTC8_OFFSET_SECS).unwrap_or(Utc.fix())
}

fn render_pair(dt: DateTime<Utc>) -> (String, String) {
    let local = dt.with_timezone(&utc8());
    (
        dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        local.format("%Y-%m-%d %H:%M:%S UTC+8").to_string(),
    )
}

/// `YYYY-MM-DD HH:MM:SS UTC / YYYY-MM-DD HH:MM:SS UTC+8` for a millisecond
/// timestamp. Missing or falsy input renders `N/A`; anything unparseable
/// renders an inline error instead of failing.
pub fn format_timestamp(value: Option<&Value>) -> String {
    let Some(value) = value.filter(|v| !is_falsy(v)) else {
        return NOT_AVAILABLE.to_string();
    };
    match utc_datetime(value) {
        Some(dt) => {
            let (utc, local) = render_pair(dt);
            format!("{} / {}", utc, local)
        }
        None => format!(
            "Error: Invalid timestamp ({})",
            display_value(Some(value), "None")
        ),
    }
}

/// [`format_timestamp`] with each zone kept separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampParts {
    pub utc: String,
    pub utc8: String,
    pub raw: Value,
}

pub fn format_timestamp_detailed(value: Option<&Value>) -> TimestampParts {
    let raw = value.cloned().unwrap_or(Value::Null);
    if is_falsy(&raw) {
        return TimestampParts {
            utc: NOT_AVAILABLE.to_string(),
            utc8: NOT_AVAILABLE.to_string(),
            raw,
        };
    }
    match utc_datetime(&raw) {
        Some(dt) => {
            let (utc, utc8) = render_pair(dt);
            TimestampParts { utc, utc8, raw }
        }
        None => {
            let error = format!("Error: Invalid timestamp ({})", display_value(Some(&raw), "None"));
            TimestampParts {
                utc: error.clone(),
                utc8: error,
                raw,
            }
        }
    }
}

/// Sets `target` to the formatted `source` for every pair. Source fields
/// are left as they were.
pub fn enrich_timestamps(record: &mut Record, fields: &[(&str, &str)]) {
    for (source, target) in fields {
        let formatted = format_timestamp(record.get(*source));
        record.insert((*target).to_string(), Value::String(formatted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_both_zones() {
        assert_eq!(
            format_timestamp(Some(&json!(1700000000000_i64))),
            "2023-11-14 22:13:20 UTC / 2023-11-15 06:13:20 UTC+8"
        );
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(
            format_timestamp(Some(&json!("1700000000000"))),
            "2023-11-14 22:13:20 UTC / 2023-11-15 06:13:20 UTC+8"
        );
    }

    #[test]
    fn falsy_values_render_not_available() {
        assert_eq!(format_timestamp(None), "N/A");
        assert_eq!(format_timestamp(Some(&json!(0))), "N/A");
        assert_eq!(format_timestamp(Some(&Value::Null)), "N/A");
        assert_eq!(format_timestamp(Some(&json!(""))), "N/A");
    }

    #[test]
    fn garbage_renders_inline_error() {
        assert_eq!(
            format_timestamp(Some(&json!("not-a-number"))),
            "Error: Invalid timestamp (not-a-number)"
        );
        assert_eq!(
            format_timestamp(Some(&json!({"v": 1}))),
            "Error: Invalid timestamp ({\"v\":1})"
        );
    }

    #[test]
    fn detailed_variant_splits_zones() {
        let parts = format_timestamp_detailed(Some(&json!(1700000000000_i64)));
        assert_eq!(parts.utc, "2023-11-14 22:13:20 UTC");
        assert_eq!(parts.utc8, "2023-11-15 06:13:20 UTC+8");
        assert_eq!(parts.raw, json!(1700000000000_i64));

        let missing = format_timestamp_detailed(None);
        assert_eq!(missing.utc, "N/A");
        assert_eq!(missing.raw, Value::Null);
    }

    #[test]
    fn enrich_adds_formatted_fields() {
        let mut record = json!({"createTime": 1700000000000_i64})
            .as_object()
            .cloned()
            .unwrap();
        enrich_timestamps(
            &mut record,
            &[("createTime", "formattedCreateTime"), ("updateTime", "formattedUpdateTime")],
        );
        assert_eq!(
            record["formattedCreateTime"],
            json!("2023-11-14 22:13:20 UTC / 2023-11-15 06:13:20 UTC+8")
        );
        assert_eq!(record["formattedUpdateTime"], json!("N/A"));
        assert_eq!(record["createTime"], json!(1700000000000_i64));
    }
}
