use crate::constants::history::DEFAULT_LANGUAGE;
use crate::errors::ToolError;
use crate::models::thing_model::{PropertyDefinition, ThingModel};
use crate::services::insights::{DeviceInsights, PropertyReading};
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::text::display_value;
use serde_json::{json, Value};
use std::sync::Arc;

pub const PROPERTY_TOOLS: &[&str] = &["get_device_tsl_properties", "get_device_latest_properties"];

/// Case-insensitive match on property name or code. `all` or no filter
/// keeps every property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter(Option<String>);

impl PropertyFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self(None),
            Some(text) if text.eq_ignore_ascii_case("all") => Self(None),
            Some(text) => Self(Some(text.to_lowercase())),
        }
    }

    pub fn matches(&self, definition: &PropertyDefinition) -> bool {
        match &self.0 {
            None => true,
            Some(needle) => {
                definition.name.to_lowercase().contains(needle)
                    || definition.code.to_lowercase().contains(needle)
            }
        }
    }
}

#[derive(Clone)]
pub struct PropertyManager {
    logger: Logger,
    validation: Validation,
    client: Arc<IotClient>,
    insights: Arc<DeviceInsights>,
}

impl PropertyManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        client: Arc<IotClient>,
        insights: Arc<DeviceInsights>,
    ) -> Self {
        Self {
            logger: logger.child("properties"),
            validation,
            client,
            insights,
        }
    }

    async fn get_device_tsl_properties(&self, args: &Value) -> Result<String, ToolError> {
        let product_key = self.validation.required_string(args, "product_key")?;
        let device_key = self.validation.required_string(args, "device_key")?;

        let model = match self
            .client
            .get_product_thing_model(None, Some(&product_key), DEFAULT_LANGUAGE)
            .await
        {
            Ok(data) => ThingModel::from_value(&data),
            Err(err) => {
                self.logger.warn(
                    "thing model unavailable",
                    Some(&json!({ "productKey": product_key, "error": err.message })),
                );
                None
            }
        };
        let snapshot = self
            .client
            .query_device_properties(&product_key, &device_key)
            .await;
        Ok(render_tsl_properties(
            &product_key,
            &device_key,
            model.as_ref(),
            &snapshot,
        ))
    }

    async fn get_device_latest_properties(&self, args: &Value) -> Result<String, ToolError> {
        let product_key = self.validation.required_string(args, "product_key")?;
        let device_key = self.validation.required_string(args, "device_key")?;
        let filter = PropertyFilter::parse(
            self.validation
                .optional_string(args, "property_filter")?
                .as_deref(),
        );

        let (definitions, readings) = match self
            .insights
            .property_summary(&product_key, &device_key)
            .await
        {
            Ok(summary) => {
                let definitions = summary
                    .properties
                    .iter()
                    .map(|reading| reading.definition.clone())
                    .collect::<Vec<_>>();
                (definitions, Some(summary.properties))
            }
            Err(failure) => {
                self.logger.warn(
                    "latest property values unavailable",
                    Some(&json!({ "deviceKey": device_key, "error": failure.error.message })),
                );
                (failure.definitions, None)
            }
        };

        let definitions: Vec<PropertyDefinition> = definitions
            .into_iter()
            .filter(|definition| filter.matches(definition))
            .collect();
        let readings = readings.map(|readings| {
            readings
                .into_iter()
                .filter(|reading| filter.matches(&reading.definition))
                .collect::<Vec<_>>()
        });
        Ok(render_latest_properties(
            &product_key,
            &device_key,
            &definitions,
            readings.as_deref(),
        ))
    }
}

fn render_tsl_properties(
    product_key: &str,
    device_key: &str,
    model: Option<&ThingModel>,
    snapshot: &Result<Value, ToolError>,
) -> String {
    let mut text = format!(
        "\nDevice TSL Property Data Query:\n{}\nDevice Key: {}\nProduct Key: {}\n\nTSL Definition Summary:\n",
        "=".repeat(24),
        device_key,
        product_key
    );
    match model {
        Some(model) => {
            text.push_str(&format!("Supported Properties Count: {}\n", model.declared));
            text.push_str("Property List:\n");
            for property in &model.properties {
                text.push_str(&format!(
                    "  - {} ({}) [{}]\n",
                    property.name, property.code, property.unit
                ));
            }
        }
        None => text.push_str("Unable to get TSL definition\n"),
    }

    text.push_str("\nReal-time Property Data:\n");
    match snapshot {
        Ok(Value::Object(values)) => {
            for (key, value) in values {
                text.push_str(&format!("  - {}: {}\n", key, display_value(Some(value), "None")));
            }
        }
        Ok(Value::Array(items)) => {
            for item in items {
                text.push_str(&format!("  - {}\n", item));
            }
        }
        Ok(other) => text.push_str(&format!("  - {}\n", display_value(Some(other), "None"))),
        Err(err) => text.push_str(&format!("Status: {}\n", err.display_text())),
    }

    text.push_str(
        "\nNotes:\n- TSL definition shows all properties supported by the device\n- Real-time data shows current property values\n- If no real-time data, device may be offline or API endpoint mismatch\n",
    );
    text
}

fn render_reading(reading: &PropertyReading, lines: &mut Vec<String>) {
    let definition = &reading.definition;
    match &reading.latest {
        Some(sample) if !sample.value.is_null() => {
            let unit = if definition.unit.is_empty() {
                String::new()
            } else {
                format!(" {}", definition.unit)
            };
            lines.push(format!(
                "   - {}: {}{}",
                definition.name,
                display_value(Some(&sample.value), "None"),
                unit
            ));
            lines.push(format!("     └─ Updated: {}", sample.formatted_time));
        }
        _ => lines.push(format!("   - {}: No recent data", definition.name)),
    }
    lines.push(String::new());
}

fn render_latest_properties(
    product_key: &str,
    device_key: &str,
    definitions: &[PropertyDefinition],
    readings: Option<&[PropertyReading]>,
) -> String {
    let mut lines = vec![
        "Device Latest Properties (Quick Summary)".to_string(),
        "=".repeat(40),
        format!("Device Key: {}", device_key),
        format!("Product Key: {}", product_key),
        String::new(),
    ];

    if definitions.is_empty() {
        lines.push("Unable to retrieve TSL definition for this product.".to_string());
        lines.push(String::new());
    } else {
        lines.push(format!(
            "Available Properties for this Device ({} properties):",
            definitions.len()
        ));
        lines.push(String::new());
        for definition in definitions {
            lines.push(format!("{} ({})", definition.name, definition.code));
            lines.push(format!("   ├─ Type: {}", definition.data_type));
            lines.push(format!("   ├─ Unit: {}", definition.unit));
            lines.push(format!("   └─ Property ID: {}", definition.id));
            lines.push(String::new());
        }
    }

    match readings {
        Some(readings) if !readings.is_empty() => {
            lines.push("Latest Property Values:".to_string());
            lines.push(String::new());
            for reading in readings {
                render_reading(reading, &mut lines);
            }
        }
        Some(_) => {
            lines.push("No recent property values found.".to_string());
            lines.push(String::new());
        }
        None => {
            lines.push("Unable to retrieve latest property values.".to_string());
            lines.push(String::new());
        }
    }

    lines.push("To get more detailed historical data, use:".to_string());
    lines.push(format!(
        "   get_device_data_history(product_key=\"{}\", device_key=\"{}\", direction=1, page_size=10)",
        product_key, device_key
    ));
    lines.join("\n")
}

#[async_trait::async_trait]
impl ToolHandler for PropertyManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.logger.debug(tool, None);
        match tool {
            "get_device_tsl_properties" => self.get_device_tsl_properties(&args).await,
            "get_device_latest_properties" => self.get_device_latest_properties(&args).await,
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "property",
                tool,
                PROPERTY_TOOLS,
            )),
        }
    }
}
