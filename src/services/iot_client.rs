use crate::constants::{endpoints, pagination};
use crate::errors::ToolError;
use crate::models::envelope::{Envelope, EnvelopeStatus};
use crate::models::history::{DataHistoryQuery, EventHistoryQuery, HistoryPage};
use crate::models::Record;
use crate::services::credential::CredentialStore;
use crate::services::logger::Logger;
use crate::services::transport::{UpstreamRequest, UpstreamTransport};
use crate::utils::time_format::enrich_timestamps;
use serde_json::{json, Value};
use std::sync::Arc;

const DETAIL_TIME_FIELDS: &[(&str, &str)] = &[
    ("createTime", "formattedCreateTime"),
    ("activedTime", "formattedActivedTime"),
    ("updateTime", "formattedUpdateTime"),
    ("firstConnTime", "formattedFirstConnTime"),
    ("lastConnTime", "formattedLastConnTime"),
    ("lastOfflineTime", "formattedLastOfflineTime"),
];

const LIST_TIME_FIELDS: &[(&str, &str)] = &[
    ("createTime", "formattedCreateTime"),
    ("activedTime", "formattedActivedTime"),
    ("updateTime", "formattedUpdateTime"),
];

/// Device addressed either by numeric id or by product/device key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationTarget {
    DeviceId(i64),
    Keys {
        product_key: String,
        device_key: String,
    },
}

impl LocationTarget {
    /// A non-zero device id wins over the key pair.
    pub fn resolve(
        product_key: Option<String>,
        device_key: Option<String>,
        device_id: Option<i64>,
    ) -> Result<Self, ToolError> {
        if let Some(id) = device_id.filter(|id| *id != 0) {
            return Ok(LocationTarget::DeviceId(id));
        }
        match (product_key, device_key) {
            (Some(product_key), Some(device_key))
                if !product_key.is_empty() && !device_key.is_empty() =>
            {
                Ok(LocationTarget::Keys {
                    product_key,
                    device_key,
                })
            }
            _ => Err(ToolError::invalid_params(
                "Either device_id or both product_key and device_key must be provided",
            )),
        }
    }

    fn params(&self) -> Vec<(String, String)> {
        match self {
            LocationTarget::DeviceId(id) => vec![("deviceId".to_string(), id.to_string())],
            LocationTarget::Keys {
                product_key,
                device_key,
            } => vec![
                ("productKey".to_string(), product_key.clone()),
                ("deviceKey".to_string(), device_key.clone()),
            ],
        }
    }
}

fn is_empty_data(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Records gathered by a paginated walk and the number of pages that
/// answered successfully.
#[derive(Debug, Clone, Default)]
pub struct PageWalk {
    pub records: Vec<Record>,
    pub pages: usize,
}

/// Typed access to the platform OpenAPI. Every call is authorized with the
/// shared credential store.
pub struct IotClient {
    logger: Logger,
    transport: Arc<dyn UpstreamTransport>,
    credentials: Arc<CredentialStore>,
}

impl IotClient {
    pub fn new(
        logger: Logger,
        transport: Arc<dyn UpstreamTransport>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            logger: logger.child("api"),
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    async fn call(&self, request: UpstreamRequest) -> Result<Envelope, ToolError> {
        let credential = self.credentials.get_token().await?;
        let request = request.authorized(credential.as_str());
        let raw = self.transport.send(&request).await?;
        Envelope::parse(raw, &request.path)
    }

    async fn call_checked(&self, request: UpstreamRequest) -> Result<Envelope, ToolError> {
        let envelope = self.call(request).await?;
        envelope.ensure_success()?;
        Ok(envelope)
    }

    /// History endpoints may answer `code: {}` alongside real data.
    async fn call_checked_lenient(&self, request: UpstreamRequest) -> Result<Envelope, ToolError> {
        let path = request.path.clone();
        let envelope = self.call(request).await?;
        if envelope.status() == EnvelopeStatus::Tentative {
            self.logger.warn(
                "envelope code is an empty object, accepting because data is present",
                Some(&json!({ "path": path })),
            );
        }
        envelope.ensure_success_lenient()?;
        Ok(envelope)
    }

    /// Fetches `path` page by page (1-based `pageNo`) and concatenates the
    /// `data` arrays. Failures on the first page are returned; failures on
    /// later pages end the walk with what was collected so far.
    pub async fn fetch_all_pages(
        &self,
        path: &str,
        fixed_params: &[(String, String)],
        page_size: usize,
    ) -> Result<Vec<Record>, ToolError> {
        Ok(self.walk_pages(path, fixed_params, page_size).await?.records)
    }

    /// [`IotClient::fetch_all_pages`] that also reports how many pages were
    /// fetched.
    pub async fn walk_pages(
        &self,
        path: &str,
        fixed_params: &[(String, String)],
        page_size: usize,
    ) -> Result<PageWalk, ToolError> {
        let page_size = page_size.max(1);
        let mut records = Vec::new();
        let mut page_no = 1usize;
        let mut pages_fetched = 0usize;

        loop {
            let request = UpstreamRequest::get(path)
                .params(fixed_params)
                .param("pageSize", page_size)
                .param("pageNo", page_no);
            let outcome = self.call_checked(request).await;
            let envelope = match outcome {
                Ok(envelope) => envelope,
                Err(err) if page_no == 1 => return Err(err),
                Err(err) => {
                    self.logger.warn(
                        "page failed, keeping partial result",
                        Some(&json!({ "path": path, "page": page_no, "error": err.message })),
                    );
                    break;
                }
            };
            pages_fetched += 1;

            let page = match envelope.data {
                None => {
                    self.logger.warn(
                        "page has no data field",
                        Some(&json!({ "path": path, "page": page_no })),
                    );
                    break;
                }
                Some(Value::Array(items)) => items,
                Some(other) => {
                    let err = ToolError::malformed(format!(
                        "Expected a list in data from {}, got {}",
                        path,
                        json_type(&other)
                    ));
                    if page_no == 1 {
                        return Err(err);
                    }
                    self.logger.warn(&err.message, Some(&json!({ "page": page_no })));
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            let count = page.len();
            for item in page {
                match item {
                    Value::Object(record) => records.push(record),
                    other => self.logger.debug(
                        "skipping non-object list item",
                        Some(&json!({ "path": path, "type": json_type(&other) })),
                    ),
                }
            }
            if count < page_size {
                break;
            }

            page_no += 1;
            if page_no > pagination::MAX_PAGES {
                self.logger.warn(
                    "page cap reached, stopping pagination",
                    Some(&json!({ "path": path, "max_pages": pagination::MAX_PAGES })),
                );
                break;
            }
        }

        self.logger.info(
            "paginated fetch finished",
            Some(&json!({ "path": path, "records": records.len(), "pages": pages_fetched })),
        );
        Ok(PageWalk {
            records,
            pages: pages_fetched,
        })
    }

    pub async fn list_products(&self, page_size: usize) -> Result<Vec<Record>, ToolError> {
        self.fetch_all_pages(endpoints::PRODUCTS, &[], page_size).await
    }

    pub async fn list_devices(
        &self,
        product_key: &str,
        page_size: usize,
    ) -> Result<Vec<Record>, ToolError> {
        let params = [("productKey".to_string(), product_key.to_string())];
        self.fetch_all_pages(endpoints::DEVICE_OVERVIEW, &params, page_size)
            .await
    }

    pub async fn list_devices_with_formatted_time(
        &self,
        product_key: &str,
        page_size: usize,
    ) -> Result<Vec<Record>, ToolError> {
        let mut devices = self.list_devices(product_key, page_size).await?;
        for device in devices.iter_mut() {
            enrich_timestamps(device, LIST_TIME_FIELDS);
        }
        Ok(devices)
    }

    /// Raw TSL export for a product.
    pub async fn get_product_tsl(&self, product_key: &str) -> Result<Value, ToolError> {
        let request =
            UpstreamRequest::get(endpoints::PRODUCT_TSL_EXPORT).param("productKey", product_key);
        let envelope = self.call_checked(request).await?;
        envelope.data.ok_or_else(|| {
            ToolError::not_found(format!("No TSL definition found for product {}", product_key))
        })
    }

    /// Thing model by product id (preferred) or product key.
    pub async fn get_product_thing_model(
        &self,
        product_id: Option<i64>,
        product_key: Option<&str>,
        language: &str,
    ) -> Result<Value, ToolError> {
        let request =
            UpstreamRequest::get(endpoints::PRODUCT_TSL_EXPORT).param("language", language);
        let request = match (product_id.filter(|id| *id != 0), product_key) {
            (Some(id), _) => request.param("productId", id),
            (None, Some(key)) if !key.is_empty() => request.param("productKey", key),
            _ => {
                return Err(ToolError::invalid_params(
                    "Either productId or productKey must be provided.",
                ))
            }
        };
        let envelope = self.call_checked(request).await?;
        Ok(envelope.data.unwrap_or_else(|| Value::Object(Default::default())))
    }

    pub async fn get_device_detail(
        &self,
        product_key: &str,
        device_key: &str,
    ) -> Result<Record, ToolError> {
        let request = UpstreamRequest::get(endpoints::DEVICE_DETAIL)
            .param("productKey", product_key)
            .param("deviceKey", device_key);
        let envelope = self.call_checked(request).await?;
        let mut detail = envelope
            .data_record()
            .filter(|record| !record.is_empty())
            .ok_or_else(|| ToolError::not_found("No device detail found"))?;
        enrich_timestamps(&mut detail, DETAIL_TIME_FIELDS);
        Ok(detail)
    }

    /// Tries each property snapshot endpoint in order and returns the first
    /// non-empty `data` that came with code 200.
    pub async fn query_device_properties(
        &self,
        product_key: &str,
        device_key: &str,
    ) -> Result<Value, ToolError> {
        let credential = self.credentials.get_token().await?;
        for endpoint in endpoints::PROPERTY_CANDIDATES {
            let request = UpstreamRequest::get(endpoint)
                .param("productKey", product_key)
                .param("deviceKey", device_key)
                .authorized(credential.as_str());
            let envelope = match self.transport.send(&request).await {
                Ok(raw) => Envelope::parse(raw, endpoint),
                Err(err) => Err(err),
            };
            match envelope {
                Ok(envelope) if envelope.status() == EnvelopeStatus::Success => {
                    if let Some(data) = envelope.data.filter(|data| !is_empty_data(data)) {
                        self.logger.info(
                            "property data retrieved",
                            Some(&json!({ "endpoint": endpoint })),
                        );
                        return Ok(data);
                    }
                }
                Ok(envelope) => self.logger.debug(
                    "property endpoint returned no data",
                    Some(&json!({ "endpoint": endpoint, "status": format!("{:?}", envelope.status()) })),
                ),
                Err(err) => self.logger.debug(
                    "property endpoint failed",
                    Some(&json!({ "endpoint": endpoint, "error": err.message })),
                ),
            }
        }
        Err(ToolError::not_found(
            "No TSL property data available from any endpoint",
        ))
    }

    pub async fn query_device_location(
        &self,
        target: &LocationTarget,
        language: &str,
    ) -> Result<Record, ToolError> {
        let request = UpstreamRequest::get(endpoints::DEVICE_LOCATION)
            .params(&target.params())
            .param("language", language);
        let envelope = self.call_checked(request).await?;
        let mut location = envelope
            .data_record()
            .filter(|record| !record.is_empty())
            .ok_or_else(|| {
                ToolError::not_found("No location data found for the specified device")
            })?;
        if location.contains_key("locateTime") {
            enrich_timestamps(&mut location, &[("locateTime", "formattedLocateTime")]);
        }
        Ok(location)
    }

    /// Resource snapshot (battery, signal, versions). Null data is an empty
    /// record, not an error.
    pub async fn query_device_resources(
        &self,
        product_key: &str,
        device_key: &str,
        language: &str,
    ) -> Result<Record, ToolError> {
        let request = UpstreamRequest::get(endpoints::DEVICE_RESOURCE)
            .param("productKey", product_key)
            .param("deviceKey", device_key)
            .param("language", language)
            .form_content();
        let envelope = self.call_checked(request).await?;
        match envelope.data {
            None => Ok(Record::new()),
            Some(Value::Object(record)) => Ok(record),
            Some(other) => Err(ToolError::malformed(format!(
                "Expected an object in resource data, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Writes the `switch` property. Succeeds only when both the envelope and
    /// the per-device result report code 200.
    pub async fn power_switch(
        &self,
        product_key: &str,
        device_key: &str,
        on: bool,
    ) -> Result<(), ToolError> {
        let payload = serde_json::to_string(&json!([{ "switch": on }]))
            .map_err(|err| ToolError::internal(err.to_string()))?;
        let body = json!({
            "data": payload,
            "devices": [device_key],
            "productKey": product_key,
        });
        let envelope = self
            .call(UpstreamRequest::post(endpoints::DEVICE_WRITE_DATA, body))
            .await?;
        let device_code = envelope
            .data_array()
            .and_then(|items| items.first())
            .and_then(|first| first.get("code"))
            .and_then(Value::as_i64);
        if envelope.status() == EnvelopeStatus::Success && device_code == Some(200) {
            self.logger.info(
                "power switch written",
                Some(&json!({ "productKey": product_key, "deviceKey": device_key, "on": on })),
            );
            return Ok(());
        }
        Err(ToolError::upstream(envelope.message()).with_details(json!({
            "device_code": device_code,
        })))
    }

    pub async fn query_device_data_history(
        &self,
        query: &DataHistoryQuery,
    ) -> Result<HistoryPage, ToolError> {
        let request = UpstreamRequest::get(endpoints::DATA_HISTORY)
            .params(&query.params())
            .form_content();
        let envelope = self.call_checked_lenient(request).await?;
        Ok(HistoryPage::from_envelope(&envelope))
    }

    pub async fn query_device_event_history(
        &self,
        query: &EventHistoryQuery,
    ) -> Result<HistoryPage, ToolError> {
        let request = UpstreamRequest::get(endpoints::EVENT_HISTORY)
            .params(&query.params())
            .form_content();
        let envelope = self.call_checked_lenient(request).await?;
        Ok(HistoryPage::from_envelope(&envelope))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
