use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    fn from_env() -> Self {
        ["IOT_LOG_LEVEL", "LOG_LEVEL"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find_map(|raw| LogLevel::parse(&raw))
            .unwrap_or(LogLevel::Info)
    }

    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Leveled logger writing to stderr; stdout belongs to the MCP channel.
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
    level: LogLevel,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            level: LogLevel::from_env(),
        }
    }

    pub fn with_level(context: &str, level: LogLevel) -> Self {
        Self {
            context: context.to_string(),
            level,
        }
    }

    pub fn child(&self, suffix: &str) -> Self {
        let context = if suffix.is_empty() {
            self.context.clone()
        } else {
            format!("{}:{}", self.context, suffix)
        };
        Self {
            context,
            level: self.level,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    fn log(&self, level: LogLevel, message: &str, meta: Option<&Value>) {
        if !self.enabled(level) {
            return;
        }
        let meta_suffix = meta
            .filter(|m| !m.is_null())
            .map(|m| format!(" {}", m))
            .unwrap_or_default();
        eprintln!(
            "[{}] {} [{}] {}{}",
            chrono::Utc::now().to_rfc3339(),
            level.label(),
            self.context,
            message,
            meta_suffix
        );
    }

    pub fn error(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Error, message, meta);
    }

    pub fn warn(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Warn, message, meta);
    }

    pub fn info(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Info, message, meta);
    }

    pub fn debug(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Debug, message, meta);
    }
}
