use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::utils::suggest::suggest;

use serde_json::Value;

/// A manager that answers one or more MCP tools with report text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError>;
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        let Some(handler) = self.handlers.get(tool).cloned() else {
            let names = self.tool_names();
            let candidates: Vec<&str> = names.iter().map(String::as_str).collect();
            let suggestions = suggest(tool, &candidates, 3);
            let hint = if suggestions.is_empty() {
                "Call tools/list to see the available tools".to_string()
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            return Err(ToolError::invalid_params(format!("Unknown tool: {}", tool)).with_hint(hint));
        };

        let trace_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().timestamp_millis();
        self.logger.debug(
            "tool call",
            Some(&serde_json::json!({ "tool": tool, "trace_id": trace_id })),
        );

        let result = handler.handle(tool, args).await;
        let duration_ms = chrono::Utc::now().timestamp_millis() - started_at;
        match &result {
            Ok(text) => self.logger.info(
                "tool call finished",
                Some(&serde_json::json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "bytes": text.len(),
                })),
            ),
            Err(err) => self.logger.warn(
                "tool call failed",
                Some(&serde_json::json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "kind": err.kind,
                    "code": err.code,
                })),
            ),
        }
        result
    }
}
