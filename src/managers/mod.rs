pub mod devices;
pub mod health;
pub mod history;
pub mod location;
pub mod products;
pub mod properties;

use crate::errors::ToolError;
use serde::Serialize;

pub(crate) fn json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| ToolError::internal(format!("Failed to render JSON: {}", err)))
}
