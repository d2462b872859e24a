use crate::errors::ToolError;
use crate::managers::json_text;
use crate::models::Record;
use crate::services::iot_client::{IotClient, LocationTarget};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::text::{field, is_present};
use crate::utils::time_format::format_timestamp;
use serde_json::Value;
use std::sync::Arc;

pub const LOCATION_TOOLS: &[&str] = &["query_device_location", "get_device_location_raw"];

const COORDINATE_SYSTEMS: &[(&str, &str, &str)] = &[
    ("WGS84", "wgsLat", "wgsLng"),
    ("GCJ02", "gcjLat", "gcjLng"),
    ("BD09", "bdLat", "bdLng"),
];

const EXTRA_FIELDS: &[(&str, &str)] = &[
    ("Accuracy", "accuracy"),
    ("Speed", "speed"),
    ("Height", "height"),
    ("Satellites", "satellites"),
];

#[derive(Clone)]
pub struct LocationManager {
    logger: Logger,
    validation: Validation,
    client: Arc<IotClient>,
}

impl LocationManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<IotClient>) -> Self {
        Self {
            logger: logger.child("location"),
            validation,
            client,
        }
    }

    async fn fetch(&self, args: &Value) -> Result<Record, ToolError> {
        let target = LocationTarget::resolve(
            self.validation.optional_string(args, "product_key")?,
            self.validation.optional_string(args, "device_key")?,
            self.validation.optional_i64(args, "device_id")?,
        )?;
        let language = self.validation.language(args)?;
        self.client.query_device_location(&target, &language).await
    }

    async fn query_device_location(&self, args: &Value) -> Result<String, ToolError> {
        let location = self.fetch(args).await?;
        Ok(render_location(&location))
    }

    async fn get_device_location_raw(&self, args: &Value) -> Result<String, ToolError> {
        let location = self.fetch(args).await?;
        json_text(&location)
    }
}

/// Coordinates appear only for systems with both components present.
pub fn render_location(location: &Record) -> String {
    let mut lines = vec![
        format!("Device Key: {}", field(location, "deviceKey", "N/A")),
        format!("Product Key: {}", field(location, "productKey", "N/A")),
        format!("Location Time: {}", format_timestamp(location.get("locateTime"))),
        format!("Location Status: {}", field(location, "locateStatus", "N/A")),
    ];
    for (label, lat, lng) in COORDINATE_SYSTEMS {
        if is_present(location.get(*lat)) && is_present(location.get(*lng)) {
            lines.push(format!(
                "{} Coordinates: {}, {}",
                label,
                field(location, lat, ""),
                field(location, lng, "")
            ));
        }
    }
    for (label, key) in EXTRA_FIELDS {
        if is_present(location.get(*key)) {
            lines.push(format!("{}: {}", label, field(location, key, "")));
        }
    }
    lines.join("\n")
}

#[async_trait::async_trait]
impl ToolHandler for LocationManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.logger.debug(tool, None);
        match tool {
            "query_device_location" => self.query_device_location(&args).await,
            "get_device_location_raw" => self.get_device_location_raw(&args).await,
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "location",
                tool,
                LOCATION_TOOLS,
            )),
        }
    }
}
