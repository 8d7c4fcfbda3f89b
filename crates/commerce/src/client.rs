//! Commerce API client wrapper
//!
//! One [`CommerceClient`] is one authenticated session: a shared HTTP client
//! with connection reuse and a fixed timeout, plus the bearer token fetched
//! when the session was configured. Clones share both.

use std::sync::Arc;

use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::{authenticate, SessionToken};
use crate::config::CommerceConfig;
use crate::error::{CommerceError, CommerceResult};

/// Authenticated commerce API session
#[derive(Clone)]
pub struct CommerceClient {
    http: Client,
    config: Arc<CommerceConfig>,
    token: Arc<SessionToken>,
}

/// Fully-read HTTP response
///
/// The body is drained before anything inspects the status, so the
/// connection goes back to the pool on every path and error variants can
/// carry the raw body.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn decode<T: DeserializeOwned>(&self, context: &'static str) -> CommerceResult<T> {
        serde_json::from_str(&self.body).map_err(|e| CommerceError::decode(context, e))
    }
}

impl CommerceClient {
    /// Validate configuration, build the transport and authenticate.
    ///
    /// Configuration problems are reported before any request is sent.
    pub async fn configure(config: CommerceConfig) -> CommerceResult<Self> {
        let config = config.validated()?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let token = authenticate(&http, &config.identity_url, &config.credentials).await?;

        tracing::info!(
            contract_id = config.contract_id,
            commerce_url = %config.commerce_url,
            "Commerce session configured"
        );

        Ok(Self {
            http,
            config: Arc::new(config),
            token: Arc::new(token),
        })
    }

    pub fn config(&self) -> &CommerceConfig {
        &self.config
    }

    pub fn contract_id(&self) -> i64 {
        self.config.contract_id
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// `{commerce_url}{path}`
    pub(crate) fn commerce_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.commerce_url, path)
    }

    /// `{commerce_url}/api/v2/contracts/{contract_id}{path}`
    pub(crate) fn contract_endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v2/contracts/{}{}",
            self.config.commerce_url, self.config.contract_id, path
        )
    }

    /// `{commerce_url}/api/v2/contracts/{contract_id}{path}/{segment}`, with
    /// `segment` escaped as a single path segment
    pub(crate) fn contract_resource(&self, path: &str, segment: &str) -> CommerceResult<Url> {
        append_segment(&self.contract_endpoint(path), segment)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(self.token.access_token())
            .header(header::ACCEPT, "application/json")
    }

    pub(crate) async fn get(&self, url: impl reqwest::IntoUrl) -> CommerceResult<RawResponse> {
        self.execute(self.authorized(self.http.get(url))).await
    }

    pub(crate) async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> CommerceResult<RawResponse> {
        let payload = serde_json::to_vec(body).map_err(|source| CommerceError::Encode {
            context: "json",
            source,
        })?;
        let builder = self
            .authorized(self.http.post(url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(builder).await
    }

    pub(crate) async fn post_empty(&self, url: &str) -> CommerceResult<RawResponse> {
        let builder = self.authorized(self.http.post(url)).body(Vec::<u8>::new());
        self.execute(builder).await
    }

    async fn execute(&self, builder: RequestBuilder) -> CommerceResult<RawResponse> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "Commerce request failed");
            CommerceError::Transport(e)
        })?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body_len = body.len(), "Commerce response received");

        Ok(RawResponse { status, body })
    }
}

fn append_segment(base: &str, segment: &str) -> CommerceResult<Url> {
    if matches!(segment.trim(), "" | "." | "..") {
        return Err(CommerceError::InvalidOrderId(segment.to_string()));
    }

    let mut url = Url::parse(base)
        .map_err(|e| CommerceError::Configuration(format!("invalid endpoint {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| CommerceError::Configuration(format!("endpoint {} cannot take a path", base)))?
        .push(segment);
    Ok(url)
}
