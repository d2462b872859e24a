use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError};
use crate::mcp::catalog::{list_tools, tool_by_name, tool_names, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, ToolCallResult, PROTOCOL_VERSION};
use crate::utils::suggest::suggest;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const SERVER_NAME: &str = "iot-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub async fn new() -> Result<Self, ToolError> {
        let app = App::initialize()?;
        Ok(Self::from_app(app))
    }

    pub fn from_app(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    async fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    async fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": list_tools() })
    }

    /// Schema violations and unknown tools are protocol errors; failures
    /// inside a tool are reported in the result with `isError`.
    async fn handle_tools_call(&self, name: &str, raw_args: Value) -> Result<Value, McpError> {
        if tool_by_name(name).is_none() {
            let suggestions = suggest(name, &tool_names(), 3);
            let message = if suggestions.is_empty() {
                format!("Unknown tool: {}", name)
            } else {
                format!("Unknown tool: {}. Did you mean: {}?", name, suggestions.join(", "))
            };
            return Err(McpError::invalid_params(message));
        }

        let args = if raw_args.is_null() {
            Value::Object(Default::default())
        } else {
            raw_args
        };
        validate_tool_args(name, &args)?;

        let result = match self.app.tool_executor.execute(name, args).await {
            Ok(text) => ToolCallResult::text(text),
            Err(err) => ToolCallResult::error(err.display_text()),
        };
        serde_json::to_value(result)
            .map_err(|err| McpError::new(ErrorCode::InternalError, err.to_string()))
    }

    /// Handles one line of input. Returns the serialized response, or `None`
    /// for notifications and blank lines.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Err(_) => Some(JsonRpcResponse::failure(
                Value::Null,
                ErrorCode::ParseError.as_i32(),
                "Parse error".to_string(),
            )),
            Ok(parsed) => match serde_json::from_value::<JsonRpcRequest>(parsed) {
                Err(_) => Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::InvalidRequest.as_i32(),
                    "Invalid request".to_string(),
                )),
                Ok(request) => self.dispatch(request).await,
            },
        };
        response.map(|response| serde_json::to_string(&response).unwrap_or_default())
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") && request.is_notification() {
            return None;
        }
        let id = request.id.clone()?;
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize().await),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list().await),
            "tools/call" => {
                let params = request.params.as_object().cloned().unwrap_or_default();
                let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                if name.is_empty() {
                    JsonRpcResponse::failure(
                        id,
                        ErrorCode::InvalidParams.as_i32(),
                        "Missing tool name".to_string(),
                    )
                } else {
                    let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                    match self.handle_tools_call(name, args).await {
                        Ok(result) => JsonRpcResponse::success(id, result),
                        Err(err) => JsonRpcResponse::failure(id, err.code.as_i32(), err.message),
                    }
                }
            }
            _ => JsonRpcResponse::failure(
                id,
                ErrorCode::MethodNotFound.as_i32(),
                "Method not found".to_string(),
            ),
        };
        Some(response)
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);
        self.app.logger.info(
            "serving on stdio",
            Some(&serde_json::json!({ "version": SERVER_VERSION })),
        );

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            if let Some(payload) = self.handle_line(&line).await {
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        self.app.logger.info("stdin closed, shutting down", None);
        Ok(())
    }
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new().await?;
    server.run_stdio().await
}
