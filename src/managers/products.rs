use crate::constants::pagination::PAGE_SIZE;
use crate::errors::ToolError;
use crate::managers::json_text;
use crate::models::Record;
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::codes;
use crate::utils::text::{display_value, field, rule};
use crate::utils::time_format::format_timestamp;
use serde_json::Value;
use std::sync::Arc;

pub const PRODUCT_TOOLS: &[&str] = &[
    "list_products",
    "list_products_detailed",
    "get_product_definition",
    "get_product_thing_model",
];

#[derive(Clone)]
pub struct ProductManager {
    logger: Logger,
    validation: Validation,
    client: Arc<IotClient>,
}

impl ProductManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<IotClient>) -> Self {
        Self {
            logger: logger.child("products"),
            validation,
            client,
        }
    }

    async fn list_products(&self, args: &Value, detailed: bool) -> Result<String, ToolError> {
        let page_size = self
            .validation
            .positive_u32(args, "page_size", PAGE_SIZE as u32)? as usize;
        let products = self.client.list_products(page_size).await?;
        if products.is_empty() {
            return Ok("No products found in your account.".to_string());
        }

        let (title, width) = if detailed {
            ("Detailed Product List", 80)
        } else {
            ("Product list", 60)
        };
        let mut lines = vec![
            format!("{} (total: {} products):", title, products.len()),
            rule(width),
        ];
        for (index, product) in products.iter().enumerate() {
            lines.push(render_product(index + 1, product, detailed));
        }
        Ok(lines.join("\n"))
    }

    async fn get_product_definition(&self, args: &Value) -> Result<String, ToolError> {
        let product_key = self.validation.required_string(args, "product_key")?;
        let tsl = self.client.get_product_tsl(&product_key).await?;
        json_text(&tsl)
    }

    async fn get_product_thing_model(&self, args: &Value) -> Result<String, ToolError> {
        let product_id = self.validation.optional_i64(args, "product_id")?;
        let product_key = self.validation.optional_string(args, "product_key")?;
        let language = self.validation.language(args)?;
        let model = self
            .client
            .get_product_thing_model(product_id, product_key.as_deref(), &language)
            .await?;
        json_text(&model)
    }
}

fn coded(label: String, raw: Option<&Value>) -> String {
    format!("{} ({})", label, display_value(raw, "None"))
}

fn render_product(index: usize, product: &Record, detailed: bool) -> String {
    let mut block = format!(
        "\n{}. {}\n   Product Key: {}\n   Access Type: {}\n   Network Way: {}\n   Data Format: {}\n   Connect Platform: {}\n   Logo Path: {}\n   Created Time: {}\n   Updated Time: {}\n",
        index,
        field(product, "productName", "Unknown"),
        field(product, "productKey", "N/A"),
        coded(codes::access_type(product.get("accessType")), product.get("accessType")),
        coded(codes::network_way(product.get("netWay")), product.get("netWay")),
        coded(codes::data_format(product.get("dataFmt")), product.get("dataFmt")),
        field(product, "connectPlatform", "N/A"),
        field(product, "logoPath", "None"),
        format_timestamp(product.get("createTime")),
        format_timestamp(product.get("updateTime")),
    );
    if detailed {
        block.push_str(&format!("   Raw Data: {}\n", Value::Object(product.clone())));
    }
    block
}

#[async_trait::async_trait]
impl ToolHandler for ProductManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.logger.debug(tool, None);
        match tool {
            "list_products" => self.list_products(&args, false).await,
            "list_products_detailed" => self.list_products(&args, true).await,
            "get_product_definition" => self.get_product_definition(&args).await,
            "get_product_thing_model" => self.get_product_thing_model(&args).await,
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "product",
                tool,
                PRODUCT_TOOLS,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_block_shows_labels_and_raw_codes() {
        let product = json!({
            "productName": "Smart Meter",
            "productKey": "pk-1",
            "accessType": 1,
            "netWay": "2",
            "dataFmt": 3,
            "createTime": 1700000000000_i64
        });
        let block = render_product(1, product.as_object().unwrap(), false);
        assert!(block.starts_with("\n1. Smart Meter\n"));
        assert!(block.contains("Access Type: Gateway Device (1)"));
        assert!(block.contains("Network Way: Cellular (2G/3G/4G/5G) (2)"));
        assert!(block.contains("Data Format: Thing Model (3)"));
        assert!(block.contains("Logo Path: None"));
        assert!(block.contains("Created Time: 2023-11-14 22:13:20 UTC / 2023-11-15 06:13:20 UTC+8"));
        assert!(block.contains("Updated Time: N/A"));
        assert!(!block.contains("Raw Data"));
    }

    #[test]
    fn detailed_block_appends_raw_record() {
        let product = json!({"productKey": "pk-1"});
        let block = render_product(2, product.as_object().unwrap(), true);
        assert!(block.contains("2. Unknown"));
        assert!(block.contains("Network Way: Not Specified (None)"));
        assert!(block.contains(r#"Raw Data: {"productKey":"pk-1"}"#));
    }
}
