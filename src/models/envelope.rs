use crate::constants::upstream::SUCCESS_CODE;
use crate::errors::ToolError;
use serde::Deserialize;
use serde_json::Value;

/// `code` as the upstream actually sends it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeCode {
    Numeric(i64),
    Object(serde_json::Map<String, Value>),
    Other(Value),
}

impl EnvelopeCode {
    fn describe(&self) -> String {
        match self {
            EnvelopeCode::Numeric(code) => code.to_string(),
            EnvelopeCode::Object(map) if map.is_empty() => "{}".to_string(),
            EnvelopeCode::Object(map) => Value::Object(map.clone()).to_string(),
            EnvelopeCode::Other(value) => value.to_string(),
        }
    }
}

/// Pagination counters arrive either as integers or as `{ "value": n }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PageCount {
    Number(i64),
    Wrapped {
        #[serde(default)]
        value: Option<i64>,
    },
    Other(Value),
}

impl PageCount {
    pub fn get(&self) -> Option<i64> {
        match self {
            PageCount::Number(n) => Some(*n),
            PageCount::Wrapped { value } => *value,
            PageCount::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Success,
    /// `code` is an empty object but `data` is present. Only the history
    /// endpoints answer this way.
    Tentative,
    Failure { code: String, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<EnvelopeCode>,
    #[serde(default)]
    pub msg: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, rename = "pageNum")]
    pub page_num: Option<PageCount>,
    #[serde(default, rename = "pageSize")]
    pub page_size: Option<PageCount>,
    #[serde(default)]
    pub pages: Option<PageCount>,
    #[serde(default)]
    pub total: Option<PageCount>,
}

impl Envelope {
    pub fn parse(raw: Value, path: &str) -> Result<Self, ToolError> {
        serde_json::from_value(raw).map_err(|err| {
            ToolError::malformed(format!("Response from {} is not an envelope: {}", path, err))
        })
    }

    pub fn message(&self) -> String {
        match &self.msg {
            Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
            Some(Value::Null) | None => "Unknown error".to_string(),
            Some(Value::String(_)) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn status(&self) -> EnvelopeStatus {
        match &self.code {
            Some(EnvelopeCode::Numeric(code)) if *code == SUCCESS_CODE => EnvelopeStatus::Success,
            Some(EnvelopeCode::Numeric(code)) => EnvelopeStatus::Failure {
                code: code.to_string(),
                message: self.message(),
            },
            Some(EnvelopeCode::Object(map)) if map.is_empty() && self.data.is_some() => {
                EnvelopeStatus::Tentative
            }
            code => EnvelopeStatus::Failure {
                code: code
                    .as_ref()
                    .map(EnvelopeCode::describe)
                    .unwrap_or_else(|| "missing".to_string()),
                message: self.message(),
            },
        }
    }

    /// Errors unless `code` is 200.
    pub fn ensure_success(&self) -> Result<(), ToolError> {
        match self.status() {
            EnvelopeStatus::Success => Ok(()),
            EnvelopeStatus::Tentative => Err(self.failure("{}".to_string(), self.message())),
            EnvelopeStatus::Failure { code, message } => Err(self.failure(code, message)),
        }
    }

    /// Like [`Envelope::ensure_success`], but also accepts a tentative
    /// envelope.
    pub fn ensure_success_lenient(&self) -> Result<(), ToolError> {
        match self.status() {
            EnvelopeStatus::Success | EnvelopeStatus::Tentative => Ok(()),
            EnvelopeStatus::Failure { code, message } => Err(self.failure(code, message)),
        }
    }

    fn failure(&self, code: String, message: String) -> ToolError {
        ToolError::upstream(format!("{} (code {})", message, code))
            .with_details(serde_json::json!({ "code": code }))
    }

    pub fn data_array(&self) -> Option<&Vec<Value>> {
        self.data.as_ref().and_then(Value::as_array)
    }

    /// `data` as an object; non-object data counts as absent.
    pub fn data_record(&self) -> Option<super::Record> {
        self.data.as_ref().and_then(Value::as_object).cloned()
    }
}
