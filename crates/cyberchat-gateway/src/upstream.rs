//! HTTP client for the backend inference API.
//!
//! Every gateway route that talks to the upstream goes through
//! [`UpstreamClient`], so transport failures and error bodies are mapped
//! to [`CyberchatError`] in exactly one place.

use std::time::Duration;

use cyberchat_core::config::UpstreamConfig;
use cyberchat_core::CyberchatError;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, CyberchatError> {
        // no overall request timeout: relayed streams may run for minutes,
        // silence is bounded by the idle timeout instead
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| CyberchatError::Internal(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Maximum silence between two body reads; `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.config.idle_timeout_secs > 0).then(|| Duration::from_secs(self.config.idle_timeout_secs))
    }

    /// Send a request and return the raw response, whatever its status.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, CyberchatError> {
        let url = self.config.url(path);
        debug!(%method, %url, "upstream request");

        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(|e| {
            warn!(%url, error = %e, "upstream unreachable");
            CyberchatError::UpstreamUnavailable(e.to_string())
        })
    }

    /// Send a request and decode a successful JSON body.
    ///
    /// A non-success status becomes [`CyberchatError::UpstreamStatus`]
    /// carrying the upstream's `detail`, or `fallback` when there is none.
    /// An empty success body decodes as `Value::Null`.
    pub async fn json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<Value, CyberchatError> {
        let resp = self.send(method, path, body).await?;
        if !resp.status().is_success() {
            return Err(status_error(resp, fallback).await);
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CyberchatError::StreamInterrupted(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Turn a non-success upstream response into an error, reading its body
/// for a `detail` message.
pub async fn status_error(resp: reqwest::Response, fallback: &str) -> CyberchatError {
    let status = resp.status().as_u16();
    let body = resp.bytes().await.unwrap_or_default();
    let message = error_detail(&body).unwrap_or_else(|| fallback.to_string());
    warn!(status, %message, "upstream rejected request");
    CyberchatError::UpstreamStatus { status, message }
}

/// Extract `detail` from an upstream error body.
///
/// A string detail is used as-is; any other non-null detail (FastAPI
/// validation errors are arrays) is rendered as JSON text.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
