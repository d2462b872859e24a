use crate::constants::limits::ERROR_BODY_PREVIEW_BYTES;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::utils::redact::redact_credential;
use crate::utils::text::truncate_utf8_prefix;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

pub const JSON_CONTENT: &str = "application/json";
pub const FORM_CONTENT: &str = "application/x-www-form-urlencoded";

/// One upstream call. Query values are raw; the transport encodes them.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub authorization: Option<String>,
    pub content_type: &'static str,
}

impl UpstreamRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            authorization: None,
            content_type: JSON_CONTENT,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn params<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        self.query.extend(pairs.into_iter().cloned());
        self
    }

    pub fn form_content(mut self) -> Self {
        self.content_type = FORM_CONTENT;
        self
    }

    pub fn authorized(mut self, credential: &str) -> Self {
        self.authorization = Some(credential.to_string());
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Seam between the API access layer and the network.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Sends the request and returns the decoded JSON body of a 2xx response.
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, ToolError>;
}

pub struct HttpTransport {
    logger: Logger,
    base_url: Option<String>,
    client: Client,
}

impl HttpTransport {
    pub fn new(logger: Logger, base_url: Option<String>) -> Result<Self, ToolError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("http"),
            base_url,
            client,
        })
    }

    fn base_url(&self) -> Result<&str, ToolError> {
        self.base_url.as_deref().ok_or_else(|| {
            ToolError::config("BASE_URL is not configured")
                .with_hint("Set BASE_URL to the platform OpenAPI root")
        })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, ToolError> {
        let url = build_url(self.base_url()?, &request.path, &request.query)?;
        self.logger.debug(
            "request",
            Some(&serde_json::json!({
                "method": request.method.as_str(),
                "path": request.path,
                "authorization": request.authorization.as_deref().map(redact_credential),
            })),
        );

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, request.content_type);
        if let Some(credential) = &request.authorization {
            builder = builder.header(AUTHORIZATION, credential.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::transport(format!(
                "HTTP {} from {}",
                status.as_u16(),
                request.path
            ))
            .with_details(serde_json::json!({
                "status": status.as_u16(),
                "body": truncate_utf8_prefix(&text, ERROR_BODY_PREVIEW_BYTES),
            })));
        }

        response.json::<Value>().await.map_err(|err| {
            ToolError::malformed(format!(
                "Response from {} is not valid JSON: {}",
                request.path, err
            ))
        })
    }
}

/// Joins base URL and path, then appends form-encoded query pairs.
pub fn build_url(base_url: &str, path: &str, query: &[(String, String)]) -> Result<Url, ToolError> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|err| ToolError::config(format!("Invalid upstream URL {}: {}", raw, err)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::config(format!(
            "Unsupported BASE_URL scheme: {}",
            url.scheme()
        )));
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        return ToolError::transport("HTTP request timed out");
    }
    ToolError::transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_reserved_characters_once() {
        let url = build_url(
            "https://api.example.com/",
            "/v2/devicemgr/r3/openapi/device/detail",
            &[
                ("productKey".to_string(), "p 1".to_string()),
                ("username".to_string(), "a=b&c".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v2/devicemgr/r3/openapi/device/detail?productKey=p+1&username=a%3Db%26c"
        );
    }

    #[test]
    fn build_url_rejects_non_http_schemes() {
        let err = build_url("ftp://api.example.com", "/x", &[]).unwrap_err();
        assert_eq!(err.kind, crate::errors::ToolErrorKind::Config);
    }

    #[test]
    fn request_builder_collects_query_and_auth() {
        let request = UpstreamRequest::get("/v2/x")
            .param("pageNo", 2)
            .authorized("token")
            .form_content();
        assert_eq!(request.query_value("pageNo"), Some("2"));
        assert_eq!(request.authorization.as_deref(), Some("token"));
        assert_eq!(request.content_type, FORM_CONTENT);
    }
}
