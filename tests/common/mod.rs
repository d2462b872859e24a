#![allow(dead_code)]

use iot_mcp::app::App;
use iot_mcp::constants::endpoints;
use iot_mcp::errors::ToolError;
use iot_mcp::services::clock::ManualClock;
use iot_mcp::services::config::Settings;
use iot_mcp::services::transport::{UpstreamRequest, UpstreamTransport};
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub static ENV_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

pub const NOW_SECS: i64 = 1_700_000_000;

/// In-memory upstream: answers each path from its own queue and records
/// every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ToolError>>>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, path: &str, body: Value) {
        self.push_result(path, Ok(body));
    }

    pub fn push_err(&self, path: &str, err: ToolError) {
        self.push_result(path, Err(err));
    }

    fn push_result(&self, path: &str, result: Result<Value, ToolError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<UpstreamRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

#[async_trait::async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, ToolError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ToolError::transport(format!(
                    "no scripted response for {}",
                    request.path
                )))
            })
    }
}

pub fn jwt_with_exp(exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "exp": exp, "sub": "tester" }),
        &EncodingKey::from_secret(b"scripted"),
    )
    .expect("encode jwt")
}

/// Keys configured, no cached token.
pub fn settings() -> Settings {
    Settings {
        base_url: Some("https://iot.example.test".to_string()),
        access_key: Some("ak-test".to_string()),
        access_secret: Some("sk-test".to_string()),
        access_token: None,
    }
}

/// Keys configured plus a token valid for a day past `NOW_SECS`.
pub fn authorized_settings() -> Settings {
    Settings {
        access_token: Some(jwt_with_exp(NOW_SECS + 86_400)),
        ..settings()
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_secs(NOW_SECS))
}

pub fn test_app(transport: Arc<ScriptedTransport>) -> App {
    App::with_components(&authorized_settings(), transport, clock()).expect("app wiring")
}

pub fn ok(data: Value) -> Value {
    json!({ "code": 200, "msg": "success", "data": data })
}

pub fn login_ok(transport: &ScriptedTransport, exp: i64) -> String {
    let token = jwt_with_exp(exp);
    transport.push(
        endpoints::AUTH_LOGIN,
        json!({ "access_token": token, "exp": exp }),
    );
    token
}

pub fn devices(count: usize, offset: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| json!({ "deviceKey": format!("dk-{}", offset + i), "deviceStatus": 1 }))
            .collect(),
    )
}
