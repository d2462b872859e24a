use crate::constants::history::DEFAULT_LANGUAGE;
use crate::errors::ToolError;
use serde_json::Value;

const LANGUAGES: &[&str] = &["CN", "EN"];

/// Argument extraction for tool handlers. The catalog schema has already
/// run, so these mostly normalise and apply defaults.
#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(&self, value: &Value, label: &str) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(normalized.to_string())
    }

    pub fn ensure_optional_string(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<String>, ToolError> {
        match value {
            None => Ok(None),
            Some(val) if val.is_null() => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(val) => self.ensure_string(val, label).map(Some),
        }
    }

    pub fn required_string(&self, args: &Value, key: &str) -> Result<String, ToolError> {
        let value = args.get(key).ok_or_else(|| {
            ToolError::invalid_params(format!("{} is required", key))
        })?;
        self.ensure_string(value, key)
    }

    pub fn optional_string(&self, args: &Value, key: &str) -> Result<Option<String>, ToolError> {
        self.ensure_optional_string(args.get(key), key)
    }

    /// Integers, or strings holding one, since some clients stringify numbers.
    pub fn optional_i64(&self, args: &Value, key: &str) -> Result<Option<i64>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                ToolError::invalid_params(format!("{} must be an integer", key))
            }),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => text.trim().parse::<i64>().map(Some).map_err(|_| {
                ToolError::invalid_params(format!("{} must be an integer", key))
            }),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be an integer",
                key
            ))),
        }
    }

    /// Event types are sent as strings; integers are accepted and rendered.
    pub fn optional_code_string(
        &self,
        args: &Value,
        key: &str,
    ) -> Result<Option<String>, ToolError> {
        match args.get(key) {
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            other => self.ensure_optional_string(other, key),
        }
    }

    pub fn positive_u32(&self, args: &Value, key: &str, fallback: u32) -> Result<u32, ToolError> {
        match self.optional_i64(args, key)? {
            None => Ok(fallback),
            Some(value) if value >= 1 && value <= u32::MAX as i64 => Ok(value as u32),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be a positive integer",
                key
            ))),
        }
    }

    pub fn language(&self, args: &Value) -> Result<String, ToolError> {
        let Some(raw) = self.optional_string(args, "language")? else {
            return Ok(DEFAULT_LANGUAGE.to_string());
        };
        let normalized = raw.to_uppercase();
        if LANGUAGES.contains(&normalized.as_str()) {
            return Ok(normalized);
        }
        Err(ToolError::invalid_params(format!(
            "language must be one of {}",
            LANGUAGES.join(", ")
        )))
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_strings_are_trimmed_and_non_empty() {
        let v = Validation::new();
        let args = json!({"product_key": "  pk1 ", "device_key": "  "});
        assert_eq!(v.required_string(&args, "product_key").unwrap(), "pk1");
        assert!(v.required_string(&args, "device_key").is_err());
        assert!(v.required_string(&args, "missing").is_err());
    }

    #[test]
    fn integers_accept_numeric_strings() {
        let v = Validation::new();
        let args = json!({"a": 5, "b": "17", "c": "x", "d": null});
        assert_eq!(v.optional_i64(&args, "a").unwrap(), Some(5));
        assert_eq!(v.optional_i64(&args, "b").unwrap(), Some(17));
        assert!(v.optional_i64(&args, "c").is_err());
        assert_eq!(v.optional_i64(&args, "d").unwrap(), None);
    }

    #[test]
    fn language_defaults_and_normalises() {
        let v = Validation::new();
        assert_eq!(v.language(&json!({})).unwrap(), "CN");
        assert_eq!(v.language(&json!({"language": "en"})).unwrap(), "EN");
        assert!(v.language(&json!({"language": "fr"})).is_err());
    }

    #[test]
    fn page_sizes_must_be_positive() {
        let v = Validation::new();
        assert_eq!(v.positive_u32(&json!({}), "page_size", 10).unwrap(), 10);
        assert!(v.positive_u32(&json!({"page_size": 0}), "page_size", 10).is_err());
    }
}
