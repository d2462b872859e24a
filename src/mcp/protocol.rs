use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Requests without an id expect no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

/// `tools/call` result carrying a single text block.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ToolCallResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rpc_request_allows_missing_id_for_notifications() {
        let raw = r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#;
        let parsed: JsonRpcRequest = serde_json::from_str(raw).expect("must parse");
        assert!(parsed.is_notification());
        assert_eq!(parsed.method, "notifications/initialized");
    }

    #[test]
    fn json_rpc_request_parses_id_when_present() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let parsed: JsonRpcRequest = serde_json::from_str(raw).expect("must parse");
        assert!(!parsed.is_notification());
        assert!(parsed.params.is_null());
    }

    #[test]
    fn failure_omits_result() {
        let response = JsonRpcResponse::failure(Value::from(7), -32601, "nope".to_string());
        let rendered = serde_json::to_value(&response).unwrap();
        assert!(rendered.get("result").is_none());
        assert_eq!(rendered["error"]["code"], -32601);
    }

    #[test]
    fn tool_error_result_is_flagged() {
        let rendered = serde_json::to_value(ToolCallResult::error("Error: x".to_string())).unwrap();
        assert_eq!(rendered["isError"], true);
        assert_eq!(rendered["content"][0]["type"], "text");
        assert_eq!(rendered["content"][0]["text"], "Error: x");
    }
}
