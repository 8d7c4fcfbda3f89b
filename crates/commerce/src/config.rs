//! Session configuration
//!
//! Every endpoint the client talks to is carried explicitly in
//! [`CommerceConfig`]; there is no process-wide default host.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::auth::Credentials;
use crate::error::{CommerceError, CommerceResult};

/// Default request timeout applied to every HTTP call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const ENV_IDENTITY_URL: &str = "COMMERCE_IDENTITY_URL";
pub const ENV_COMMERCE_URL: &str = "COMMERCE_API_URL";
pub const ENV_USERNAME: &str = "COMMERCE_USERNAME";
pub const ENV_PASSWORD: &str = "COMMERCE_PASSWORD";
pub const ENV_CONTRACT_ID: &str = "COMMERCE_CONTRACT_ID";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COMMERCE_REQUEST_TIMEOUT_SECS";

/// Older variable names, still read when the `COMMERCE_*` one is unset
const LEGACY_ENV: &[(&str, &str)] = &[
    (ENV_IDENTITY_URL, "BYTES_IDENTITY_HOST"),
    (ENV_COMMERCE_URL, "BYTES_COMMERCE_HOST"),
    (ENV_USERNAME, "BYTES_USERNAME"),
    (ENV_PASSWORD, "BYTES_PASSWORD"),
    (ENV_CONTRACT_ID, "BYTES_CONTRACT_ID"),
];

#[derive(Clone)]
pub struct CommerceConfig {
    /// Identity host, e.g. `https://identity.example.com`
    pub identity_url: String,
    /// Commerce API host
    pub commerce_url: String,
    pub credentials: Credentials,
    /// Contract under which baskets and orders are scoped
    pub contract_id: i64,
    pub request_timeout: Duration,
}

impl fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("identity_url", &self.identity_url)
            .field("commerce_url", &self.commerce_url)
            .field("credentials", &self.credentials)
            .field("contract_id", &self.contract_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CommerceConfig {
    pub fn new(
        identity_url: impl Into<String>,
        commerce_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        contract_id: i64,
    ) -> Self {
        Self {
            identity_url: identity_url.into(),
            commerce_url: commerce_url.into(),
            credentials: Credentials::new(username, password),
            contract_id,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from `COMMERCE_*` environment variables.
    ///
    /// Each required variable falls back to its `BYTES_*` name
    /// (`BYTES_IDENTITY_HOST`, `BYTES_COMMERCE_HOST`, `BYTES_USERNAME`,
    /// `BYTES_PASSWORD`, `BYTES_CONTRACT_ID`).
    pub fn from_env() -> CommerceResult<Self> {
        let contract_id = required_env(ENV_CONTRACT_ID)?
            .trim()
            .parse::<i64>()
            .map_err(|e| {
                CommerceError::Configuration(format!("{} is not a valid integer: {}", ENV_CONTRACT_ID, e))
            })?;

        let mut config = Self::new(
            required_env(ENV_IDENTITY_URL)?,
            required_env(ENV_COMMERCE_URL)?,
            required_env(ENV_USERNAME)?,
            required_env(ENV_PASSWORD)?,
            contract_id,
        );

        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                CommerceError::Configuration(format!(
                    "{} is not a valid number of seconds: {}",
                    ENV_REQUEST_TIMEOUT_SECS, e
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Check every field and normalize the host URLs.
    ///
    /// Runs before any network call is made.
    pub fn validated(mut self) -> CommerceResult<Self> {
        self.identity_url = normalize_base_url("identity_url", &self.identity_url)?;
        self.commerce_url = normalize_base_url("commerce_url", &self.commerce_url)?;
        self.credentials.validate()?;

        if self.contract_id == 0 {
            return Err(CommerceError::Configuration(
                "contract_id must be set".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(CommerceError::Configuration(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(self)
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn required_env(name: &str) -> CommerceResult<String> {
    if let Some(value) = non_blank_env(name) {
        return Ok(value);
    }

    let legacy = LEGACY_ENV
        .iter()
        .find(|(current, _)| *current == name)
        .map(|(_, legacy)| *legacy);
    if let Some(value) = legacy.and_then(non_blank_env) {
        tracing::debug!(variable = name, "Using legacy environment variable");
        return Ok(value);
    }

    Err(CommerceError::Configuration(format!("{} must be set", name)))
}

fn normalize_base_url(field: &str, raw: &str) -> CommerceResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CommerceError::Configuration(format!("{} must be set", field)));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| CommerceError::Configuration(format!("{} is not a valid URL: {}", field, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CommerceError::Configuration(format!(
            "{} must use http or https, got {}",
            field,
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}
