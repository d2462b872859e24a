use crate::constants::{auth as auth_constants, endpoints};
use crate::errors::ToolError;
use crate::models::auth::LoginResponse;
use crate::services::clock::Clock;
use crate::services::config::{AccessKeys, Settings};
use crate::services::logger::Logger;
use crate::services::transport::{UpstreamRequest, UpstreamTransport};
use crate::utils::redact::redact_credential;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

/// Bearer token sent as the `Authorization` header on every upstream call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: Option<i64>,
}

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Expiry in unix seconds, when the token carries one.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &redact_credential(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: f64,
}

/// Reads the `exp` claim without verifying the signature.
pub fn decode_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp as i64)
}

/// Signed access-key login parameters.
#[derive(Debug, Clone)]
pub struct SignedLogin {
    canonical: String,
    password: String,
}

impl SignedLogin {
    pub fn new(keys: &AccessKeys, timestamp_ms: i64) -> Self {
        let canonical = format!(
            "ver={}&auth_mode={}&sign_method={}&access_key={}&timestamp={}",
            auth_constants::SIGN_VERSION,
            auth_constants::AUTH_MODE,
            auth_constants::SIGN_METHOD,
            keys.access_key,
            timestamp_ms
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(keys.access_secret.as_bytes());
        let password = hex::encode(hasher.finalize());
        Self {
            canonical,
            password,
        }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// The canonical string travels as `username`; the transport
    /// percent-encodes it with the rest of the query.
    pub fn request(&self) -> UpstreamRequest {
        UpstreamRequest::get(endpoints::AUTH_LOGIN)
            .param("grant_type", auth_constants::GRANT_TYPE)
            .param("username", &self.canonical)
            .param("password", &self.password)
    }
}

/// Process-wide credential cache. Refreshes when the cached token is absent,
/// undecodable, or within `REFRESH_MARGIN_SECS` of expiry. No lock is held
/// across the login call, so concurrent refreshes may both hit the network;
/// the last writer wins and both tokens are valid.
pub struct CredentialStore {
    logger: Logger,
    keys: Result<AccessKeys, ToolError>,
    transport: Arc<dyn UpstreamTransport>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<String>>,
}

impl CredentialStore {
    pub fn new(
        logger: Logger,
        settings: &Settings,
        transport: Arc<dyn UpstreamTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            logger: logger.child("credentials"),
            keys: settings.access_keys(),
            transport,
            clock,
            cached: Mutex::new(settings.access_token.clone()),
        }
    }

    pub fn seed(&self, token: impl Into<String>) {
        *self.cached.lock().unwrap_or_else(|err| err.into_inner()) = Some(token.into());
    }

    pub fn cached(&self) -> Option<String> {
        self.cached
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub async fn get_token(&self) -> Result<Credential, ToolError> {
        if let Some(token) = self.cached() {
            match decode_expiry(&token) {
                Some(exp) if exp - self.clock.now_secs() > auth_constants::REFRESH_MARGIN_SECS => {
                    return Ok(Credential {
                        token,
                        expires_at: Some(exp),
                    });
                }
                Some(exp) => self.logger.debug(
                    "cached credential expires within the refresh margin",
                    Some(&serde_json::json!({ "exp": exp, "now": self.clock.now_secs() })),
                ),
                None => self
                    .logger
                    .debug("cached credential is not a decodable token", None),
            }
        }

        let credential = self.refresh().await?;
        self.seed(credential.token.clone());
        Ok(credential)
    }

    async fn refresh(&self) -> Result<Credential, ToolError> {
        let keys = self.keys.as_ref().map_err(|err| err.clone())?;
        let login = SignedLogin::new(keys, self.clock.now_millis());

        let raw = self.transport.send(&login.request()).await.map_err(|err| {
            self.logger.error(
                "accessKeyLogin request failed",
                Some(&serde_json::json!({ "kind": err.kind, "message": err.message })),
            );
            ToolError::new(
                err.kind,
                err.code.clone(),
                format!("Making the accessKeyLogin request failed: {}", err.message),
            )
        })?;
        let response: LoginResponse = serde_json::from_value(raw).map_err(|err| {
            ToolError::malformed(format!("accessKeyLogin response has unexpected shape: {}", err))
        })?;
        let token = response.access_token.clone().ok_or_else(|| {
            ToolError::auth(format!(
                "Failed to get access token: {}",
                response.message().unwrap_or("no access_token in response")
            ))
        })?;

        let expires_at = decode_expiry(&token).or_else(|| response.expiry_secs());
        self.logger.info(
            "credential refreshed",
            Some(&serde_json::json!({
                "token": redact_credential(&token),
                "exp": expires_at,
            })),
        );
        Ok(Credential { token, expires_at })
    }
}
