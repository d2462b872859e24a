use crate::errors::ToolError;

/// Access key pair used to sign credential requests.
#[derive(Clone)]
pub struct AccessKeys {
    pub access_key: String,
    pub access_secret: String,
}

impl std::fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key", &self.access_key)
            .field("access_secret", &"[REDACTED]")
            .finish()
    }
}

/// Runtime settings. Nothing here is required at startup; missing values
/// surface as `Config` errors on first use.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub access_key: Option<String>,
    pub access_secret: Option<String>,
    pub access_token: Option<String>,
}

impl Settings {
    /// Reads `BASE_URL`, `ACCESS_KEY`, `ACCESS_SECRET` and `ACCESS_TOKEN`,
    /// after loading a `.env` file from the working directory if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            base_url: read("BASE_URL").map(|v| v.trim_end_matches('/').to_string()),
            access_key: read("ACCESS_KEY"),
            access_secret: read("ACCESS_SECRET"),
            access_token: read("ACCESS_TOKEN"),
        }
    }

    pub fn access_keys(&self) -> Result<AccessKeys, ToolError> {
        match (&self.access_key, &self.access_secret) {
            (Some(access_key), Some(access_secret)) => Ok(AccessKeys {
                access_key: access_key.clone(),
                access_secret: access_secret.clone(),
            }),
            _ => Err(ToolError::config("Missing ACCESS_KEY or ACCESS_SECRET")
                .with_hint("Set ACCESS_KEY and ACCESS_SECRET in the environment or a .env file")),
        }
    }
}
