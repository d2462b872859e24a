use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Property identifier as a string, whatever JSON type the upstream used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(String);

impl PropertyId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.is_empty() => Some(Self(text.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `specs` is an object for scalar types and a list for STRUCT types.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertySpecs {
    Struct(Vec<Value>),
    Scalar {
        #[serde(default)]
        unit: Option<Value>,
        #[serde(default)]
        min: Option<Value>,
        #[serde(default)]
        max: Option<Value>,
    },
    Other(Value),
}

impl Default for PropertySpecs {
    fn default() -> Self {
        PropertySpecs::Other(Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawProperty {
    id: Option<Value>,
    name: Option<String>,
    code: Option<String>,
    #[serde(rename = "dataType")]
    data_type: Option<String>,
    #[serde(default)]
    specs: PropertySpecs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub id: PropertyId,
    pub name: String,
    pub code: String,
    pub unit: String,
    pub data_type: String,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl PropertyDefinition {
    /// Entries without an id, or that are not objects, yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let raw: RawProperty = serde_json::from_value(value.clone()).ok()?;
        let id = raw.id.as_ref().and_then(PropertyId::from_value)?;
        let (unit, min, max) = match raw.specs {
            PropertySpecs::Scalar { unit, min, max } => {
                let unit = match unit {
                    Some(Value::String(text)) => text,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                (unit, min, max)
            }
            PropertySpecs::Struct(_) | PropertySpecs::Other(_) => (String::new(), None, None),
        };
        Some(Self {
            id,
            name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
            code: raw.code.unwrap_or_else(|| "unknown".to_string()),
            unit,
            data_type: raw.data_type.unwrap_or_else(|| "UNKNOWN".to_string()),
            min,
            max,
        })
    }
}

/// Product thing model as exported by the TSL endpoint.
#[derive(Debug, Clone, Default)]
pub struct ThingModel {
    pub properties: Vec<PropertyDefinition>,
    /// Number of entries in `properties`, including ones that failed to parse.
    pub declared: usize,
}

impl ThingModel {
    /// `None` when the payload has no `properties` list.
    pub fn from_value(data: &Value) -> Option<Self> {
        let entries = data.get("properties")?.as_array()?;
        Some(Self {
            properties: entries
                .iter()
                .filter_map(PropertyDefinition::from_value)
                .collect(),
            declared: entries.len(),
        })
    }
}
