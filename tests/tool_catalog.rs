mod common;
use common::{test_app, ScriptedTransport, ENV_LOCK};

use iot_mcp::mcp::catalog::{list_tools, tool_names, validate_tool_args};
use iot_mcp::services::config::Settings;
use serde_json::json;
use std::collections::BTreeSet;

fn restore_env(key: &str, previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

#[test]
fn every_catalog_tool_has_a_handler_and_back() {
    let app = test_app(ScriptedTransport::new());
    let catalog: BTreeSet<String> = tool_names().into_iter().map(str::to_string).collect();
    let handlers: BTreeSet<String> = app.tool_executor.tool_names().into_iter().collect();
    assert_eq!(catalog, handlers);
    assert_eq!(catalog.len(), 17);
}

#[test]
fn schemas_are_closed_objects() {
    for tool in list_tools() {
        let schema = &tool.input_schema;
        assert_eq!(schema["type"], "object", "{} schema type", tool.name);
        assert_eq!(
            schema["additionalProperties"],
            false,
            "{} must reject unknown fields",
            tool.name
        );
        assert!(!tool.description.is_empty(), "{} needs a description", tool.name);
    }
}

#[test]
fn paging_arguments_must_be_positive_integers() {
    let err = validate_tool_args(
        "get_device_data_history",
        &json!({ "product_key": "pk", "device_key": "dk", "page_size": 0 }),
    )
    .unwrap_err();
    assert!(err.message.contains("/page_size"));

    let err = validate_tool_args(
        "get_device_data_history",
        &json!({ "product_key": "pk", "device_key": "dk", "page_num": "two" }),
    )
    .unwrap_err();
    assert!(err.message.contains("/page_num"));

    assert!(validate_tool_args(
        "get_device_data_history",
        &json!({ "product_key": "pk", "device_key": "dk", "page_num": 3, "direction": 2 }),
    )
    .is_ok());
}

#[tokio::test]
async fn settings_are_read_from_the_environment() {
    let _guard = ENV_LOCK.lock().await;
    let keys = ["BASE_URL", "ACCESS_KEY", "ACCESS_SECRET", "ACCESS_TOKEN"];
    let previous: Vec<Option<String>> = keys.iter().map(|key| std::env::var(key).ok()).collect();

    std::env::set_var("BASE_URL", "https://iot.example.test/");
    std::env::set_var("ACCESS_KEY", "ak-env");
    std::env::set_var("ACCESS_SECRET", "sk-env");
    std::env::remove_var("ACCESS_TOKEN");

    let settings = Settings::from_env();
    assert_eq!(settings.base_url.as_deref(), Some("https://iot.example.test"));
    assert_eq!(settings.access_key.as_deref(), Some("ak-env"));
    assert!(settings.access_token.is_none());
    assert_eq!(settings.access_keys().expect("keys").access_secret, "sk-env");

    for (key, value) in keys.iter().zip(previous) {
        restore_env(key, value);
    }
}
