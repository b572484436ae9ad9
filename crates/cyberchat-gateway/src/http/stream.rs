//! Streaming relay: POST /api/query/stream
//!
//! Forwards the query body, as the caller sent it, to the upstream's
//! streaming endpoint and pipes the ndjson body back to the caller chunk by chunk. The relay never parses
//! the records; framing is the client's job.
//!
//! A read failure or idle timeout mid-stream surfaces as an error item in
//! the response body, which makes hyper abort the chunked response instead
//! of terminating it cleanly. Dropping the response (caller went away)
//! drops the upstream body stream and closes that connection too.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use cyberchat_core::config::NDJSON_CONTENT_TYPE;
use cyberchat_core::CyberchatError;
use futures_util::{Stream, StreamExt};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{failure, query_payload, ApiFailure};
use crate::app::AppState;
use crate::upstream;

const FALLBACK: &str = "Failed to stream response";

/// POST /api/query/stream
pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let req = query_payload(payload, FALLBACK)?;
    info!(
        plugin_id = ?req.get("plugin_id"),
        auto = req.get("auto_select_plugin").and_then(serde_json::Value::as_bool).unwrap_or(false),
        "relaying query stream"
    );

    let resp = state
        .upstream
        .send(Method::POST, "/api/query/stream", Some(&req))
        .await
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if !resp.status().is_success() {
        return Err(match upstream::status_error(resp, FALLBACK).await {
            CyberchatError::UpstreamStatus { status, message } => failure(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            other => failure(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        });
    }

    let body = relay_body(resp.bytes_stream(), state.upstream.idle_timeout());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Forward upstream chunks unchanged, in arrival order.
///
/// Ends cleanly only when the upstream does. A read error or `idle`
/// elapsing between two chunks yields one error item and stops.
pub fn relay_body<S, B, E>(
    upstream: S,
    idle: Option<Duration>,
) -> impl Stream<Item = Result<Bytes, CyberchatError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Into<Bytes> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut upstream = Box::pin(upstream);
        let mut chunks = 0usize;
        let mut bytes = 0usize;

        loop {
            let next = match idle {
                Some(idle) => match tokio::time::timeout(idle, upstream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let ms = idle.as_millis() as u64;
                        warn!(chunks, bytes, ms, "upstream stream idle, aborting relay");
                        yield Err(CyberchatError::Timeout { ms });
                        break;
                    }
                },
                None => upstream.next().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    let chunk: Bytes = chunk.into();
                    chunks += 1;
                    bytes += chunk.len();
                    debug!(len = chunk.len(), "forwarding chunk");
                    yield Ok(chunk);
                }
                Some(Err(e)) => {
                    warn!(chunks, bytes, error = %e, "upstream stream failed, aborting relay");
                    yield Err(CyberchatError::StreamInterrupted(e.to_string()));
                    break;
                }
                None => {
                    debug!(chunks, bytes, "upstream stream finished");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    type Item = Result<Vec<u8>, std::io::Error>;

    #[tokio::test]
    async fn forwards_chunks_unchanged() {
        let parts: Vec<Item> = vec![Ok(b"{\"te".to_vec()), Ok(b"xt\":\"hi\"}\n".to_vec())];
        let out: Vec<_> = relay_body(stream::iter(parts), None).collect().await;
        let out: Vec<Bytes> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out, vec![Bytes::from_static(b"{\"te"), Bytes::from_static(b"xt\":\"hi\"}\n")]);
    }

    #[tokio::test]
    async fn read_error_ends_with_error_item() {
        let parts: Vec<Item> = vec![
            Ok(b"a\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"never\n".to_vec()),
        ];
        let out: Vec<_> = relay_body(stream::iter(parts), None).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(&out[1], Err(CyberchatError::StreamInterrupted(m)) if m.contains("reset")));
    }

    #[tokio::test]
    async fn silence_past_idle_timeout_is_an_error() {
        let parts: Vec<Item> = vec![Ok(b"a\n".to_vec())];
        let stalled = stream::iter(parts).chain(stream::pending());
        let out: Vec<_> = relay_body(stalled, Some(Duration::from_millis(30)))
            .collect()
            .await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(CyberchatError::Timeout { ms: 30 })));
    }
}
