//! Client-credentials authentication against the identity host
//!
//! A session fetches its bearer token exactly once. The token's advertised
//! lifetime is recorded so callers can observe expiry, but nothing here
//! re-authenticates.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;

use crate::error::{CommerceError, CommerceResult};

/// Path of the token endpoint on the identity host
pub const TOKEN_PATH: &str = "/api/v1/oauth/token";

/// OAuth client credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn validate(&self) -> CommerceResult<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(CommerceError::Configuration(
                "define commerce API username and password".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// Body returned by the token endpoint
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
}

/// Bearer token held for the lifetime of one session
#[derive(Clone)]
pub struct SessionToken {
    access_token: String,
    pub token_type: String,
    /// Lifetime advertised by the identity host, in seconds
    pub expires_in: u64,
    issued_at: Instant,
}

impl SessionToken {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            issued_at: Instant::now(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// `true` once the advertised lifetime has elapsed.
    /// A token without an advertised lifetime never reports expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_in > 0 && self.issued_at.elapsed() >= Duration::from_secs(self.expires_in)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchange client credentials for a bearer token.
///
/// Fails with [`CommerceError::Configuration`] without touching the network
/// when either credential is empty. No retry: a failed login stops the session.
pub async fn authenticate(
    http: &Client,
    identity_url: &str,
    credentials: &Credentials,
) -> CommerceResult<SessionToken> {
    credentials.validate()?;

    let url = format!("{}{}", identity_url, TOKEN_PATH);
    let form = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", "client_credentials"),
    ];

    tracing::debug!(url = %url, client_id = %credentials.client_id, "Requesting access token");

    let response = http
        .post(&url)
        .header(header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;

    if status != StatusCode::OK {
        tracing::error!(status = %status, "Token request rejected");
        return Err(CommerceError::Auth {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| CommerceError::decode("token", e))?;

    tracing::info!(
        token_type = %token.token_type,
        expires_in = token.expires_in,
        "Obtained access token"
    );

    Ok(SessionToken::new(
        token.access_token,
        token.token_type,
        token.expires_in,
    ))
}
