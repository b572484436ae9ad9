//! Thin HTTP client for the cyberchat gateway.

use anyhow::{bail, Context, Result};
use cyberchat_core::types::{ApiError, Plugin, QueryRequest, Role};
use cyberchat_transcript::TranscriptError;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a streamed query.
    ///
    /// Errors are already in transcript terms so a rejected query renders
    /// the same way as one that failed mid-stream.
    pub async fn open_stream(
        &self,
        req: &QueryRequest,
    ) -> std::result::Result<reqwest::Response, TranscriptError> {
        let resp = self
            .http
            .post(self.url("/api/query/stream"))
            .json(req)
            .send()
            .await
            .map_err(|e| TranscriptError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!(%status, "stream opened");
            return Ok(resp);
        }
        let message = match resp.json::<ApiError>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(TranscriptError::Status {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn plugins(&self) -> Result<Vec<Plugin>> {
        let resp = self
            .http
            .get(self.url("/api/plugins"))
            .send()
            .await
            .context("gateway unreachable")?;
        if !resp.status().is_success() {
            bail!("{}", error_message(resp).await);
        }
        resp.json().await.context("decoding plugin list")
    }

    /// Create a conversation seeded with the user's first query; returns its id.
    pub async fn create_conversation(&self, title: &str, first: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/api/conversations"))
            .json(&json!({ "title": title, "message": first }))
            .send()
            .await
            .context("gateway unreachable")?;
        if !resp.status().is_success() {
            bail!("{}", error_message(resp).await);
        }
        let created: Created = resp.json().await.context("decoding conversation")?;
        Ok(created.id)
    }

    pub async fn add_message(
        &self,
        conversation: &str,
        role: Role,
        content: &str,
        plugin_used: Option<&str>,
    ) -> Result<()> {
        let resp = self
            .http
            .post(self.url(&format!("/api/conversations/{conversation}/messages")))
            .json(&json!({ "role": role, "content": content, "plugin_used": plugin_used }))
            .send()
            .await
            .context("gateway unreachable")?;
        if !resp.status().is_success() {
            bail!("{}", error_message(resp).await);
        }
        Ok(())
    }
}

async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ApiError>().await {
        Ok(body) => format!("{} (HTTP {})", body.error, status.as_u16()),
        Err(_) => format!("gateway returned HTTP {}", status.as_u16()),
    }
}
