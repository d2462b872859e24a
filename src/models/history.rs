use super::envelope::{Envelope, PageCount};
use crate::constants::history::{DEFAULT_LANGUAGE, DEFAULT_PAGE_SIZE};
use serde_json::Value;

/// Filters for the uplink/downlink data log.
#[derive(Debug, Clone, PartialEq)]
pub struct DataHistoryQuery {
    pub product_key: String,
    pub device_key: String,
    pub device_id: Option<i64>,
    pub begin_millis: Option<i64>,
    pub end_millis: Option<i64>,
    pub direction: Option<i64>,
    pub send_status: Option<i64>,
    pub language: String,
    pub page_num: u32,
    pub page_size: u32,
}

impl DataHistoryQuery {
    pub fn new(product_key: impl Into<String>, device_key: impl Into<String>) -> Self {
        Self {
            product_key: product_key.into(),
            device_key: device_key.into(),
            device_id: None,
            begin_millis: None,
            end_millis: None,
            direction: None,
            send_status: None,
            language: DEFAULT_LANGUAGE.to_string(),
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = base_params(
            &self.product_key,
            &self.device_key,
            &self.language,
            self.page_num,
            self.page_size,
        );
        push_opt(&mut params, "deviceId", self.device_id);
        push_opt(&mut params, "beginDateTimp", self.begin_millis);
        push_opt(&mut params, "endDateTimp", self.end_millis);
        push_opt(&mut params, "direction", self.direction);
        push_opt(&mut params, "sendStatus", self.send_status);
        params
    }
}

/// Filters for the device event log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHistoryQuery {
    pub product_key: String,
    pub device_key: String,
    pub device_id: Option<i64>,
    pub begin_millis: Option<i64>,
    pub end_millis: Option<i64>,
    pub event_type: Option<String>,
    pub language: String,
    pub page_num: u32,
    pub page_size: u32,
}

impl EventHistoryQuery {
    pub fn new(product_key: impl Into<String>, device_key: impl Into<String>) -> Self {
        Self {
            product_key: product_key.into(),
            device_key: device_key.into(),
            device_id: None,
            begin_millis: None,
            end_millis: None,
            event_type: None,
            language: DEFAULT_LANGUAGE.to_string(),
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = base_params(
            &self.product_key,
            &self.device_key,
            &self.language,
            self.page_num,
            self.page_size,
        );
        push_opt(&mut params, "deviceId", self.device_id);
        push_opt(&mut params, "beginDateTimp", self.begin_millis);
        push_opt(&mut params, "endDateTimp", self.end_millis);
        push_opt(&mut params, "eventType", self.event_type.as_deref());
        params
    }
}

fn base_params(
    product_key: &str,
    device_key: &str,
    language: &str,
    page_num: u32,
    page_size: u32,
) -> Vec<(String, String)> {
    vec![
        ("productKey".to_string(), product_key.to_string()),
        ("deviceKey".to_string(), device_key.to_string()),
        ("language".to_string(), language.to_string()),
        ("pageNum".to_string(), page_num.to_string()),
        ("pageSize".to_string(), page_size.to_string()),
    ]
}

fn push_opt<T: ToString>(params: &mut Vec<(String, String)>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.push((key.to_string(), value.to_string()));
    }
}

/// One page of history entries with whatever pagination counters came back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub entries: Vec<Value>,
    pub page_num: Option<i64>,
    pub page_size: Option<i64>,
    pub pages: Option<i64>,
    pub total: Option<i64>,
}

impl HistoryPage {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let count = |value: &Option<PageCount>| value.as_ref().and_then(PageCount::get);
        Self {
            entries: envelope.data_array().cloned().unwrap_or_default(),
            page_num: count(&envelope.page_num),
            page_size: count(&envelope.page_size),
            pages: count(&envelope.pages),
            total: count(&envelope.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_query_only_sends_set_filters() {
        let mut query = DataHistoryQuery::new("pk", "dk");
        query.direction = Some(1);
        query.page_size = 30;
        let params = query.params();
        assert!(params.contains(&("direction".to_string(), "1".to_string())));
        assert!(params.contains(&("pageSize".to_string(), "30".to_string())));
        assert!(params.contains(&("language".to_string(), "CN".to_string())));
        assert!(!params.iter().any(|(key, _)| key == "sendStatus"));
        assert!(!params.iter().any(|(key, _)| key == "deviceId"));
    }

    #[test]
    fn event_query_carries_event_type() {
        let mut query = EventHistoryQuery::new("pk", "dk");
        query.event_type = Some("4".to_string());
        query.begin_millis = Some(1_700_000_000_000);
        let params = query.params();
        assert!(params.contains(&("eventType".to_string(), "4".to_string())));
        assert!(params.contains(&("beginDateTimp".to_string(), "1700000000000".to_string())));
    }

    #[test]
    fn page_reads_wrapped_counters() {
        let envelope = Envelope::parse(
            json!({"code": {}, "data": [{"id": 1}], "pageNum": {"value": 1}, "total": {}}),
            "/history",
        )
        .unwrap();
        let page = HistoryPage::from_envelope(&envelope);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.page_num, Some(1));
        assert_eq!(page.total, None);
    }
}
