use crate::errors::ToolError;
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use serde_json::{json, Value};
use std::sync::Arc;

pub const HEALTH_TOOLS: &[&str] = &["health_check"];

pub const HEALTHY: &str = "IoT MCP Server is healthy and ready to serve requests";

/// Reports whether a credential can be obtained. Authentication trouble is
/// part of the report, not a tool failure.
#[derive(Clone)]
pub struct HealthManager {
    logger: Logger,
    client: Arc<IotClient>,
}

impl HealthManager {
    pub fn new(logger: Logger, client: Arc<IotClient>) -> Self {
        Self {
            logger: logger.child("health"),
            client,
        }
    }

    async fn health_check(&self) -> String {
        match self.client.credentials().get_token().await {
            Ok(_) => HEALTHY.to_string(),
            Err(err) => {
                self.logger.warn(
                    "health check could not obtain a credential",
                    Some(&json!({ "kind": err.kind, "error": err.message })),
                );
                format!("IoT MCP Server has authentication issues: {}", err.display_text())
            }
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for HealthManager {
    async fn handle(&self, tool: &str, _args: Value) -> Result<String, ToolError> {
        match tool {
            "health_check" => Ok(self.health_check().await),
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "health",
                tool,
                HEALTH_TOOLS,
            )),
        }
    }
}
