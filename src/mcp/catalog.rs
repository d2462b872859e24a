use crate::errors::{ErrorCode, McpError};
use crate::utils::suggest::suggest;
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{JSONSchema, ValidationError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Cap on schema problems reported for one call.
const MAX_ISSUES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_INDEX: Lazy<HashMap<&'static str, &'static ToolDef>> =
    Lazy::new(|| TOOL_CATALOG.iter().map(|tool| (tool.name.as_str(), tool)).collect());

static TOOL_VALIDATORS: Lazy<HashMap<&'static str, JSONSchema>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .filter_map(|tool| {
            JSONSchema::compile(&tool.input_schema)
                .ok()
                .map(|compiled| (tool.name.as_str(), compiled))
        })
        .collect()
});

pub fn tool_catalog() -> &'static [ToolDef] {
    TOOL_CATALOG.as_slice()
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_INDEX.get(name).copied()
}

pub fn tool_names() -> Vec<&'static str> {
    TOOL_CATALOG.iter().map(|tool| tool.name.as_str()).collect()
}

/// Tools in catalog order, as returned by `tools/list`.
pub fn list_tools() -> Vec<ToolDef> {
    TOOL_CATALOG.clone()
}

/// Checks `args` against the tool's input schema. Unknown tools pass; the
/// caller rejects those separately.
pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let (Some(tool), Some(schema)) = (tool_by_name(tool_name), TOOL_VALIDATORS.get(tool_name))
    else {
        return Ok(());
    };
    let Err(errors) = schema.validate(args) else {
        return Ok(());
    };
    let issues: Vec<SchemaIssue> = errors
        .take(MAX_ISSUES)
        .flat_map(|err| SchemaIssue::from_error(&err, args, &tool.input_schema))
        .collect();
    Err(McpError::new(
        ErrorCode::InvalidParams,
        render_issues(tool_name, &issues),
    ))
}

/// One schema problem, plus an optional "did you mean" for it.
struct SchemaIssue {
    location: String,
    problem: String,
    hint: Option<String>,
}

impl SchemaIssue {
    fn from_error(err: &ValidationError<'_>, args: &Value, schema: &Value) -> Vec<Self> {
        let pointer = err.instance_path.to_string();
        let location = if pointer.is_empty() {
            "(root)".to_string()
        } else {
            pointer.clone()
        };
        let issue = |problem: String, hint: Option<String>| Self {
            location: location.clone(),
            problem,
            hint,
        };

        match &err.kind {
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                let known = property_names(schema);
                unexpected
                    .iter()
                    .map(|field| {
                        let hint = nonempty(suggest(field, &known, 3))
                            .map(|names| format!("field '{}': {}", field, names));
                        issue(format!("unknown field '{}'", field), hint)
                    })
                    .collect()
            }
            ValidationErrorKind::Enum { options } => {
                let allowed: Vec<String> = options
                    .as_array()
                    .map(|values| values.iter().map(plain_text).collect())
                    .unwrap_or_default();
                let received = args.pointer(&pointer).map(plain_text).unwrap_or_default();
                let candidates: Vec<&str> = allowed.iter().map(String::as_str).collect();
                let hint = nonempty(suggest(&received, &candidates, 3))
                    .map(|names| format!("{}: {}", location, names));
                vec![issue(format!("expected one of {}", allowed.join(", ")), hint)]
            }
            ValidationErrorKind::Required { property } => vec![issue(
                format!("missing required field '{}'", plain_text(property)),
                None,
            )],
            ValidationErrorKind::Type { kind } => {
                vec![issue(format!("expected {}", type_names(kind)), None)]
            }
            _ => vec![issue(err.to_string(), None)],
        }
    }
}

fn render_issues(tool_name: &str, issues: &[SchemaIssue]) -> String {
    let mut out = format!("Invalid arguments for {}", tool_name);
    for issue in issues {
        out.push_str(&format!("\n- {}: {}", issue.location, issue.problem));
    }
    let hints: Vec<&str> = issues
        .iter()
        .filter_map(|issue| issue.hint.as_deref())
        .take(3)
        .collect();
    if !hints.is_empty() {
        out.push_str(&format!("\nDid you mean: {}", hints.join(" | ")));
    }
    out
}

fn property_names(schema: &Value) -> Vec<&str> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn nonempty(names: Vec<String>) -> Option<String> {
    (!names.is_empty()).then(|| names.join(", "))
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn type_names(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Single(primitive) => primitive.to_string(),
        TypeKind::Multiple(types) => {
            let names: Vec<String> = (*types).into_iter().map(|t| t.to_string()).collect();
            if names.is_empty() {
                "unknown".to_string()
            } else {
                names.join(" | ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_schema_compiles() {
        assert!(!tool_catalog().is_empty());
        for tool in tool_catalog() {
            assert!(
                TOOL_VALIDATORS.contains_key(tool.name.as_str()),
                "schema for {} did not compile",
                tool.name
            );
        }
    }

    #[test]
    fn unknown_field_suggests_the_closest_property() {
        let err = validate_tool_args(
            "list_devices",
            &json!({"product_key": "pk", "page_sise": 10}),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(err.message.starts_with("Invalid arguments for list_devices"));
        assert!(err.message.contains("unknown field 'page_sise'"));
        assert!(err.message.contains("Did you mean: field 'page_sise': page_size"));
    }

    #[test]
    fn missing_required_and_bad_enum_are_listed() {
        let err = validate_tool_args("get_product_thing_model", &json!({"language": "cn"}))
            .unwrap_err();
        assert!(err.message.contains("/language: expected one of CN, EN"));
        let err = validate_tool_args("get_device_details", &json!({"product_key": "pk"}))
            .unwrap_err();
        assert!(err.message.contains("missing required field 'device_key'"));
    }

    #[test]
    fn valid_and_unknown_tools_pass() {
        assert!(validate_tool_args("health_check", &json!({})).is_ok());
        assert!(validate_tool_args("no_such_tool", &json!({"x": 1})).is_ok());
    }
}
