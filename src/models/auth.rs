use crate::utils::time_format::value_as_millis;
use serde::Deserialize;
use serde_json::Value;

/// Body of the access-key login call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// Advisory only; the token's own `exp` claim takes precedence.
    #[serde(default)]
    pub exp: Option<Value>,
    #[serde(default)]
    pub msg: Option<Value>,
}

impl LoginResponse {
    pub fn message(&self) -> Option<&str> {
        self.msg.as_ref().and_then(Value::as_str)
    }

    /// `exp` in seconds when it is an integer, a float or a numeric string.
    pub fn expiry_secs(&self) -> Option<i64> {
        self.exp.as_ref().and_then(value_as_millis)
    }
}
