use crate::constants::history::{
    DEFAULT_LANGUAGE, DIRECTION_UPLINK, LATEST_SCAN_RECORDS, SUMMARY_SCAN_RECORDS,
};
use crate::errors::ToolError;
use crate::models::history::DataHistoryQuery;
use crate::models::millis_of;
use crate::models::thing_model::{PropertyDefinition, PropertyId, ThingModel};
use crate::services::iot_client::{IotClient, LocationTarget};
use crate::services::logger::Logger;
use crate::utils::time_format::{format_timestamp, value_as_millis};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineTimeSource {
    DeviceUpdate,
    Location,
    LastConnection,
    Unknown,
}

impl OnlineTimeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            OnlineTimeSource::DeviceUpdate => "device_update",
            OnlineTimeSource::Location => "location",
            OnlineTimeSource::LastConnection => "last_connection",
            OnlineTimeSource::Unknown => "unknown",
        }
    }
}

/// Largest present timestamp; the earlier candidate wins a tie.
pub fn select_latest(candidates: &[(Option<i64>, OnlineTimeSource)]) -> (Option<i64>, OnlineTimeSource) {
    candidates
        .iter()
        .filter_map(|(time, source)| time.filter(|t| *t != 0).map(|t| (t, *source)))
        .fold(None, |best: Option<(i64, OnlineTimeSource)>, (time, source)| match best {
            Some((best_time, _)) if best_time >= time => best,
            _ => Some((time, source)),
        })
        .map(|(time, source)| (Some(time), source))
        .unwrap_or((None, OnlineTimeSource::Unknown))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineTimeReport {
    pub device_key: String,
    pub device_update_time: Option<i64>,
    pub location_time: Option<i64>,
    pub last_conn_time: Option<i64>,
    pub latest_time: Option<i64>,
    pub source: OnlineTimeSource,
}

/// Latest value seen for one property during a history scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySample {
    pub value: Value,
    pub timestamp: i64,
    pub formatted_time: String,
    pub entry_id: Option<Value>,
    pub ticket: Option<Value>,
    pub raw_item: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestProperties {
    pub values: BTreeMap<PropertyId, PropertySample>,
    pub entries_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReading {
    pub definition: PropertyDefinition,
    pub latest: Option<PropertySample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySummary {
    pub properties: Vec<PropertyReading>,
    pub properties_with_data: usize,
    pub entries_analyzed: usize,
}

/// History scan failed; the definitions that were loaded are kept.
#[derive(Debug, Clone)]
pub struct PropertySummaryError {
    pub error: ToolError,
    pub definitions: Vec<PropertyDefinition>,
}

/// Decoded `thingModelData` (or `dmData`) items of one history entry.
fn entry_items(entry: &serde_json::Map<String, Value>) -> Option<Vec<Value>> {
    let payload = entry
        .get("thingModelData")
        .filter(|v| !v.is_null())
        .or_else(|| entry.get("dmData"))?;
    let parsed = match payload {
        Value::String(text) => serde_json::from_str::<Value>(text).ok()?,
        other => other.clone(),
    };
    match parsed {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Keeps, per property id, the value from the strictly newest entry.
/// Entries that are not objects or whose payload does not decode are skipped.
pub fn collect_latest(entries: &[Value]) -> LatestProperties {
    let mut values: BTreeMap<PropertyId, PropertySample> = BTreeMap::new();
    for entry in entries {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(items) = entry_items(entry) else {
            continue;
        };
        let created = entry
            .get("createTime")
            .and_then(value_as_millis)
            .unwrap_or(0);
        for item in items {
            let Some(id) = item.get("id").and_then(PropertyId::from_value) else {
                continue;
            };
            let newer = values
                .get(&id)
                .map_or(true, |existing| created > existing.timestamp);
            if !newer {
                continue;
            }
            values.insert(
                id,
                PropertySample {
                    value: item.get("value").cloned().unwrap_or(Value::Null),
                    timestamp: created,
                    formatted_time: format_timestamp(Some(&json!(created))),
                    entry_id: entry.get("id").cloned(),
                    ticket: entry.get("ticket").cloned(),
                    raw_item: item,
                },
            );
        }
    }
    LatestProperties {
        values,
        entries_analyzed: entries.len(),
    }
}

/// Queries that combine several upstream calls.
pub struct DeviceInsights {
    logger: Logger,
    client: Arc<IotClient>,
}

impl DeviceInsights {
    pub fn new(logger: Logger, client: Arc<IotClient>) -> Self {
        Self {
            logger: logger.child("insights"),
            client,
        }
    }

    /// Compares device detail and location timestamps. Either source failing
    /// only removes its candidates.
    pub async fn latest_online_time(&self, product_key: &str, device_key: &str) -> OnlineTimeReport {
        let (device_update_time, last_conn_time) =
            match self.client.get_device_detail(product_key, device_key).await {
                Ok(detail) => (
                    millis_of(detail.get("updateTime")),
                    millis_of(detail.get("lastConnTime")),
                ),
                Err(err) => {
                    self.logger.warn(
                        "device detail unavailable for online time",
                        Some(&json!({ "deviceKey": device_key, "error": err.message })),
                    );
                    (None, None)
                }
            };

        let target = LocationTarget::Keys {
            product_key: product_key.to_string(),
            device_key: device_key.to_string(),
        };
        let location_time = match self
            .client
            .query_device_location(&target, DEFAULT_LANGUAGE)
            .await
        {
            Ok(location) => millis_of(location.get("locateTime")),
            Err(err) => {
                self.logger.warn(
                    "location unavailable for online time",
                    Some(&json!({ "deviceKey": device_key, "error": err.message })),
                );
                None
            }
        };

        let (latest_time, source) = select_latest(&[
            (device_update_time, OnlineTimeSource::DeviceUpdate),
            (location_time, OnlineTimeSource::Location),
            (last_conn_time, OnlineTimeSource::LastConnection),
        ]);
        OnlineTimeReport {
            device_key: device_key.to_string(),
            device_update_time,
            location_time,
            last_conn_time,
            latest_time,
            source,
        }
    }

    /// Scans the most recent uplink records for property values.
    pub async fn extract_latest_properties(
        &self,
        product_key: &str,
        device_key: &str,
        max_records: u32,
    ) -> Result<LatestProperties, ToolError> {
        let mut query = DataHistoryQuery::new(product_key, device_key);
        query.direction = Some(DIRECTION_UPLINK);
        query.page_num = 1;
        query.page_size = max_records;
        let page = self.client.query_device_data_history(&query).await?;
        if page.entries.is_empty() {
            return Err(ToolError::not_found("No recent data entries found"));
        }
        let latest = collect_latest(&page.entries);
        self.logger.debug(
            "history scan finished",
            Some(&json!({
                "entries": latest.entries_analyzed,
                "properties": latest.values.len(),
            })),
        );
        Ok(latest)
    }

    pub async fn latest_properties(
        &self,
        product_key: &str,
        device_key: &str,
    ) -> Result<LatestProperties, ToolError> {
        self.extract_latest_properties(product_key, device_key, LATEST_SCAN_RECORDS)
            .await
    }

    /// Thing model definitions joined with the latest scanned values, in
    /// definition order.
    pub async fn property_summary(
        &self,
        product_key: &str,
        device_key: &str,
    ) -> Result<PropertySummary, PropertySummaryError> {
        let definitions = match self
            .client
            .get_product_thing_model(None, Some(product_key), DEFAULT_LANGUAGE)
            .await
        {
            Ok(data) => ThingModel::from_value(&data)
                .map(|model| model.properties)
                .unwrap_or_default(),
            Err(err) => {
                self.logger.warn(
                    "thing model unavailable for property summary",
                    Some(&json!({ "productKey": product_key, "error": err.message })),
                );
                Vec::new()
            }
        };

        let latest = match self
            .extract_latest_properties(product_key, device_key, SUMMARY_SCAN_RECORDS)
            .await
        {
            Ok(latest) => latest,
            Err(error) => return Err(PropertySummaryError { error, definitions }),
        };

        let properties = definitions
            .into_iter()
            .map(|definition| PropertyReading {
                latest: latest.values.get(&definition.id).cloned(),
                definition,
            })
            .collect();
        Ok(PropertySummary {
            properties,
            properties_with_data: latest.values.len(),
            entries_analyzed: latest.entries_analyzed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_time_prefers_maximum() {
        let (time, source) = select_latest(&[
            (Some(100), OnlineTimeSource::DeviceUpdate),
            (Some(300), OnlineTimeSource::Location),
            (Some(200), OnlineTimeSource::LastConnection),
        ]);
        assert_eq!(time, Some(300));
        assert_eq!(source, OnlineTimeSource::Location);
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let (time, source) = select_latest(&[
            (Some(500), OnlineTimeSource::DeviceUpdate),
            (None, OnlineTimeSource::Location),
            (Some(500), OnlineTimeSource::LastConnection),
        ]);
        assert_eq!(time, Some(500));
        assert_eq!(source, OnlineTimeSource::DeviceUpdate);
    }

    #[test]
    fn no_candidates_is_unknown() {
        let (time, source) = select_latest(&[
            (None, OnlineTimeSource::DeviceUpdate),
            (Some(0), OnlineTimeSource::Location),
        ]);
        assert_eq!(time, None);
        assert_eq!(source.as_str(), "unknown");
    }

    #[test]
    fn newest_entry_wins_per_property() {
        let entries = vec![
            json!({"createTime": 2000, "id": "e2",
                   "thingModelData": "[{\"id\":1,\"value\":\"22.5\"}]"}),
            json!({"createTime": 1000, "id": "e1",
                   "thingModelData": [{"id": 1, "value": "19.0"}, {"id": 2, "value": true}]}),
            json!({"createTime": 2000, "id": "e3",
                   "thingModelData": "[{\"id\":1,\"value\":\"99\"}]"}),
        ];
        let latest = collect_latest(&entries);
        let temp = &latest.values[&PropertyId::from_value(&json!(1)).unwrap()];
        assert_eq!(temp.value, json!("22.5"));
        assert_eq!(temp.entry_id, Some(json!("e2")));
        let flag = &latest.values[&PropertyId::from_value(&json!("2")).unwrap()];
        assert_eq!(flag.value, json!(true));
        assert_eq!(latest.entries_analyzed, 3);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let entries = vec![
            json!("not an object"),
            json!({"createTime": 10, "thingModelData": "{broken"}),
            json!({"createTime": 20, "thingModelData": [{"value": 1}, "junk"]}),
            json!({"createTime": 30, "dmData": "[{\"id\":\"5\",\"value\":7}]"}),
        ];
        let latest = collect_latest(&entries);
        assert_eq!(latest.values.len(), 1);
        let sample = latest.values.values().next().unwrap();
        assert_eq!(sample.value, json!(7));
        assert_eq!(sample.timestamp, 30);
    }
}
