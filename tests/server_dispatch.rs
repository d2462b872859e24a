mod common;

use common::{ok, test_app, ScriptedTransport};
use iot_mcp::app::App;
use iot_mcp::constants::endpoints;
use iot_mcp::mcp::server::McpServer;
use iot_mcp::services::config::Settings;
use serde_json::{json, Value};
use std::sync::Arc;

fn server(transport: Arc<ScriptedTransport>) -> McpServer {
    McpServer::from_app(test_app(transport))
}

async fn call(server: &McpServer, request: Value) -> Value {
    let line = server
        .handle_line(&request.to_string())
        .await
        .expect("response expected");
    serde_json::from_str(&line).expect("response is JSON")
}

#[tokio::test]
async fn initialize_reports_server_info() {
    let server = server(ScriptedTransport::new());
    let response = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
    )
    .await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["serverInfo"]["name"], "iot-mcp");
    assert_eq!(
        response["result"]["serverInfo"]["version"],
        env!("CARGO_PKG_VERSION")
    );
    assert!(response["result"]["protocolVersion"].is_string());
}

#[tokio::test]
async fn tools_list_returns_the_catalog() {
    let server = server(ScriptedTransport::new());
    let response = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" }),
    )
    .await;
    let tools = response["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 17);
    assert!(tools
        .iter()
        .all(|tool| tool["inputSchema"]["type"] == "object"));
}

#[tokio::test]
async fn protocol_errors_use_json_rpc_codes() {
    let server = server(ScriptedTransport::new());

    let parse: Value =
        serde_json::from_str(&server.handle_line("{not json").await.unwrap()).unwrap();
    assert_eq!(parse["error"]["code"], -32700);
    assert_eq!(parse["id"], Value::Null);

    let invalid = call(&server, json!({ "jsonrpc": "2.0", "id": 2 })).await;
    assert_eq!(invalid["error"]["code"], -32600);

    let unknown = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" }),
    )
    .await;
    assert_eq!(unknown["error"]["code"], -32601);

    let nameless = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {} }),
    )
    .await;
    assert_eq!(nameless["error"]["code"], -32602);
}

#[tokio::test]
async fn notifications_and_blank_lines_get_no_response() {
    let server = server(ScriptedTransport::new());
    assert!(server.handle_line("   ").await.is_none());
    let note = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    assert!(server.handle_line(&note.to_string()).await.is_none());
}

#[tokio::test]
async fn schema_violations_are_invalid_params() {
    let transport = ScriptedTransport::new();
    let server = server(transport.clone());
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": { "name": "list_devices", "arguments": { "productkey": "pk" } }
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("missing required field 'product_key'"));
    assert!(message.contains("unknown field 'productkey'"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn unknown_tool_suggests_a_name() {
    let server = server(ScriptedTransport::new());
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": { "name": "list_product", "arguments": {} }
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Did you mean: list_products"));
}

#[tokio::test]
async fn tool_failures_are_reported_in_the_result() {
    let transport = ScriptedTransport::new();
    transport.push(endpoints::DEVICE_DETAIL, ok(json!({})));
    let server = server(transport);
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": { "name": "get_device_details", "arguments": { "product_key": "pk", "device_key": "dk" } }
        }),
    )
    .await;
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Error: No device detail found"
    );
}

#[tokio::test]
async fn power_switch_reports_success_text() {
    let transport = ScriptedTransport::new();
    transport.push(endpoints::DEVICE_WRITE_DATA, ok(json!([{ "code": 200 }])));
    let server = server(transport.clone());
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 8, "method": "tools/call",
            "params": { "name": "power_switch", "arguments": { "product_key": "pk", "device_key": "dk", "on_off": "ON" } }
        }),
    )
    .await;
    assert_eq!(response["result"]["isError"], false);
    assert_eq!(response["result"]["content"][0]["text"], "Success");
    let body = transport.requests_to(endpoints::DEVICE_WRITE_DATA)[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body["data"], r#"[{"switch":true}]"#);
}

#[tokio::test]
async fn health_check_reports_auth_problems_as_text() {
    let settings = Settings {
        base_url: Some("https://iot.example.test".to_string()),
        ..Settings::default()
    };
    let app = App::with_components(&settings, ScriptedTransport::new(), common::clock())
        .expect("app wiring");
    let server = McpServer::from_app(app);
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 9, "method": "tools/call",
            "params": { "name": "health_check" }
        }),
    )
    .await;
    assert_eq!(response["result"]["isError"], false);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("IoT MCP Server has authentication issues: Error: Missing ACCESS_KEY"));
}

#[tokio::test]
async fn health_check_is_healthy_with_a_valid_token() {
    let server = server(ScriptedTransport::new());
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0", "id": 10, "method": "tools/call",
            "params": { "name": "health_check", "arguments": {} }
        }),
    )
    .await;
    assert_eq!(
        response["result"]["content"][0]["text"],
        "IoT MCP Server is healthy and ready to serve requests"
    );
}
