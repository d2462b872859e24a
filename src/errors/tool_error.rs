use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    /// Local configuration is missing or unusable.
    Config,
    /// The upstream refused to issue a credential.
    Auth,
    /// Network failure or non-2xx HTTP status.
    Transport,
    /// The envelope carried a non-success `code`.
    Upstream,
    /// The response could not be parsed into the expected shape.
    Malformed,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            retryable: matches!(kind, ToolErrorKind::Transport),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Config, "CONFIG", message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Auth, "AUTH", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Upstream, "UPSTREAM", message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Malformed, "MALFORMED_RESPONSE", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }

    /// Text shown to the tool caller.
    pub fn display_text(&self) -> String {
        match &self.hint {
            Some(hint) => format!("Error: {}\nHint: {}", self.message, hint),
            None => format!("Error: {}", self.message),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}
