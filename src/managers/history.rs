use crate::constants::history::DEFAULT_PAGE_SIZE;
use crate::errors::ToolError;
use crate::models::history::{DataHistoryQuery, EventHistoryQuery, HistoryPage};
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::codes;
use crate::utils::text::display_value;
use crate::utils::time_format::format_timestamp;
use serde_json::{json, Value};
use std::sync::Arc;

pub const HISTORY_TOOLS: &[&str] = &["get_device_data_history", "get_device_event_history"];

#[derive(Clone)]
pub struct HistoryManager {
    logger: Logger,
    validation: Validation,
    client: Arc<IotClient>,
}

/// Arguments shared by both history tools.
struct CommonFilters {
    product_key: String,
    device_key: String,
    device_id: Option<i64>,
    begin_millis: Option<i64>,
    end_millis: Option<i64>,
    language: String,
    page_num: u32,
    page_size: u32,
}

impl HistoryManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<IotClient>) -> Self {
        Self {
            logger: logger.child("history"),
            validation,
            client,
        }
    }

    fn common_filters(&self, args: &Value) -> Result<CommonFilters, ToolError> {
        Ok(CommonFilters {
            product_key: self.validation.required_string(args, "product_key")?,
            device_key: self.validation.required_string(args, "device_key")?,
            device_id: self.validation.optional_i64(args, "device_id")?,
            begin_millis: self.validation.optional_i64(args, "begin_date_timp")?,
            end_millis: self.validation.optional_i64(args, "end_date_timp")?,
            language: self.validation.language(args)?,
            page_num: self.validation.positive_u32(args, "page_num", 1)?,
            page_size: self
                .validation
                .positive_u32(args, "page_size", DEFAULT_PAGE_SIZE)?,
        })
    }

    async fn get_device_data_history(&self, args: &Value) -> Result<String, ToolError> {
        let filters = self.common_filters(args)?;
        let mut query = DataHistoryQuery::new(&filters.product_key, &filters.device_key);
        query.device_id = filters.device_id;
        query.begin_millis = filters.begin_millis;
        query.end_millis = filters.end_millis;
        query.direction = self.validation.optional_i64(args, "direction")?;
        query.send_status = self.validation.optional_i64(args, "send_status")?;
        query.language = filters.language.clone();
        query.page_num = filters.page_num;
        query.page_size = filters.page_size;

        let page = self.client.query_device_data_history(&query).await?;
        self.logger.debug(
            "data history page",
            Some(&json!({ "deviceKey": filters.device_key, "entries": page.entries.len() })),
        );
        Ok(render_history(
            "Device Historical Data Records",
            "No historical data found for the given criteria.",
            &filters,
            &page,
            render_data_entry,
        ))
    }

    async fn get_device_event_history(&self, args: &Value) -> Result<String, ToolError> {
        let filters = self.common_filters(args)?;
        let mut query = EventHistoryQuery::new(&filters.product_key, &filters.device_key);
        query.device_id = filters.device_id;
        query.begin_millis = filters.begin_millis;
        query.end_millis = filters.end_millis;
        query.event_type = self.validation.optional_code_string(args, "event_type")?;
        query.language = filters.language.clone();
        query.page_num = filters.page_num;
        query.page_size = filters.page_size;

        let page = self.client.query_device_event_history(&query).await?;
        self.logger.debug(
            "event history page",
            Some(&json!({ "deviceKey": filters.device_key, "entries": page.entries.len() })),
        );
        Ok(render_history(
            "Device Historical Event Records",
            "No historical event data found for the given criteria.",
            &filters,
            &page,
            render_event_entry,
        ))
    }
}

fn count_or(value: Option<i64>, fallback: impl ToString) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn render_history(
    title: &str,
    empty_message: &str,
    filters: &CommonFilters,
    page: &HistoryPage,
    render_entry: fn(usize, &Value) -> String,
) -> String {
    let mut lines = vec![
        format!(
            "{} (Device: {}, Product: {})",
            title, filters.device_key, filters.product_key
        ),
        "=".repeat(67),
        format!(
            "Pagination Info: Page {} / Total {} pages ({} items per page, Total {} items)",
            count_or(page.page_num, filters.page_num),
            count_or(page.pages, "N/A"),
            count_or(page.page_size, filters.page_size),
            count_or(page.total, "N/A"),
        ),
        "-".repeat(67),
    ];
    if page.entries.is_empty() {
        lines.push(empty_message.to_string());
        return lines.join("\n");
    }
    for (index, entry) in page.entries.iter().enumerate() {
        lines.push(render_entry(index + 1, entry));
    }
    lines.join("\n")
}

fn ext_data(entry: &Value) -> String {
    display_value(entry.get("extData"), "{}")
}

fn render_data_entry(index: usize, entry: &Value) -> String {
    let na = |key: &str| display_value(entry.get(key), "N/A");
    [
        format!("\nRecord #{}:", index),
        format!("  ID: {}", na("id")),
        format!("  Direction: {}", codes::direction(entry.get("direction"))),
        format!("  Message Type: {}", na("msgType")),
        format!("  Data Type: {}", na("dataType")),
        format!("  Created Time: {}", format_timestamp(entry.get("createTime"))),
        format!("  Send Time: {}", format_timestamp(entry.get("sendTime"))),
        format!("  Update Time: {}", format_timestamp(entry.get("updateTime"))),
        format!("  Send Status: {}", codes::send_status(entry.get("sendStatus"))),
        format!("  Raw Data (Base64): {}", na("data")),
        format!("  Thing Model Data (JSON): {}", na("dmData")),
        format!("  Ticket: {}", na("ticket")),
        format!("  Source Type: {}", na("sourceType")),
        format!("  Extended Data: {}", ext_data(entry)),
    ]
    .join("\n")
}

fn render_event_entry(index: usize, entry: &Value) -> String {
    let na = |key: &str| display_value(entry.get(key), "N/A");
    [
        format!("\nEvent #{}:", index),
        format!("  ID: {}", na("id")),
        format!("  Event Type: {}", codes::event_type(entry.get("eventType"))),
        format!("  Event Code: {}", na("eventCode")),
        format!("  Event Name: {}", na("eventName")),
        format!("  Occurrence Time: {}", format_timestamp(entry.get("createTime"))),
        format!("  Output Parameters: {}", na("outputData")),
        format!("  AB ID: {}", na("abId")),
        format!("  Packet ID: {}", na("packetId")),
        format!("  Ticket: {}", na("ticket")),
        format!("  Extended Data: {}", ext_data(entry)),
    ]
    .join("\n")
}

#[async_trait::async_trait]
impl ToolHandler for HistoryManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.logger.debug(tool, None);
        match tool {
            "get_device_data_history" => self.get_device_data_history(&args).await,
            "get_device_event_history" => self.get_device_event_history(&args).await,
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "history",
                tool,
                HISTORY_TOOLS,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> CommonFilters {
        CommonFilters {
            product_key: "pk".to_string(),
            device_key: "dk".to_string(),
            device_id: None,
            begin_millis: None,
            end_millis: None,
            language: "CN".to_string(),
            page_num: 2,
            page_size: 10,
        }
    }

    #[test]
    fn empty_page_keeps_header_and_request_fallbacks() {
        let text = render_history(
            "Device Historical Data Records",
            "No historical data found for the given criteria.",
            &filters(),
            &HistoryPage::default(),
            render_data_entry,
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Device Historical Data Records (Device: dk, Product: pk)");
        assert_eq!(
            lines[2],
            "Pagination Info: Page 2 / Total N/A pages (10 items per page, Total N/A items)"
        );
        assert_eq!(lines[4], "No historical data found for the given criteria.");
    }

    #[test]
    fn data_entry_labels_codes() {
        let entry = json!({"id": 9, "direction": 1, "sendStatus": -1, "dmData": "[{\"1\":20}]"});
        let text = render_data_entry(1, &entry);
        assert!(text.starts_with("\nRecord #1:\n  ID: 9"));
        assert!(text.contains("Direction: Uplink"));
        assert!(text.contains("Send Status: Send Failed"));
        assert!(text.contains("Created Time: N/A"));
        assert!(text.contains(r#"Thing Model Data (JSON): [{"1":20}]"#));
        assert!(text.ends_with("Extended Data: {}"));
    }

    #[test]
    fn event_entry_maps_string_and_unknown_types() {
        let text = render_event_entry(3, &json!({"eventType": "5", "eventName": "overheat"}));
        assert!(text.contains("Event #3:"));
        assert!(text.contains("Event Type: Fault"));
        assert!(text.contains("Event Name: overheat"));
        let text = render_event_entry(1, &json!({"eventType": 9}));
        assert!(text.contains("Event Type: Unknown Type (9)"));
    }

    #[test]
    fn server_counters_take_precedence() {
        let page = HistoryPage {
            entries: vec![json!({"id": 1})],
            page_num: Some(1),
            page_size: Some(5),
            pages: Some(3),
            total: Some(11),
        };
        let text = render_history("T", "none", &filters(), &page, render_event_entry);
        assert!(text.contains("Page 1 / Total 3 pages (5 items per page, Total 11 items)"));
    }
}
