use serde_json::Value;

pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}

/// Renders a JSON scalar the way it reads in a report: strings unquoted,
/// null as `fallback`.
pub fn display_value(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Field lookup on a JSON object rendered with [`display_value`].
pub fn field(record: &serde_json::Map<String, Value>, key: &str, fallback: &str) -> String {
    display_value(record.get(key), fallback)
}

/// Truthiness of an optional field: null, zero, false and empty values are
/// absent.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

pub fn rule(width: usize) -> String {
    "=".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_marks_cut_and_respects_char_boundaries() {
        assert_eq!(truncate_utf8_prefix("hello", 10), "hello");
        assert_eq!(truncate_utf8_prefix("hello", 3), "hel...");
        assert_eq!(truncate_utf8_prefix("aé", 2), "a...");
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(Some(&json!("abc")), "N/A"), "abc");
        assert_eq!(display_value(Some(&json!(12)), "N/A"), "12");
        assert_eq!(display_value(Some(&Value::Null), "N/A"), "N/A");
        assert_eq!(display_value(None, "None"), "None");
    }

    #[test]
    fn presence_follows_truthiness() {
        assert!(is_present(Some(&json!(31.2))));
        assert!(is_present(Some(&json!("0"))));
        assert!(!is_present(Some(&json!(0))));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(None));
    }
}
