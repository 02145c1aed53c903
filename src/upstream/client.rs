//! Outbound chat-completion calls.
//!
//! # Responsibilities
//! - Build `<endpoint><inbound path>?…&api-version=<version>`
//! - POST the transformed payload with credential and user-agent headers
//! - Hand back the streaming response on 2xx, a structured error otherwise
//!
//! # Design Decisions
//! - No client-side timeout: streams are open-ended and end via cancellation
//! - Every await races the request's cancellation token; dropping the
//!   in-flight reqwest future aborts the connection
//! - Error bodies are read best-effort; a failed read yields an empty body

use std::time::Instant;

use axum::http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use bytes::Bytes;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::transform::Payload;
use crate::upstream::error::UpstreamError;

/// A successful upstream response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    body: reqwest::Response,
}

impl UpstreamResponse {
    /// The SSE body as a byte stream. Dropping it closes the connection.
    pub fn into_body(self) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        self.body.bytes_stream()
    }
}

/// Per-request inputs derived from the inbound request.
#[derive(Debug, Clone, Default)]
pub struct CallContext<'a> {
    /// Raw path and query of the inbound request.
    pub path_and_query: &'a str,
    /// Resolved credential; may be empty.
    pub credential: &'a str,
    /// Caller's user agent, if any.
    pub user_agent: Option<&'a str>,
    /// Correlation id forwarded as `x-request-id`.
    pub request_id: Option<&'a str>,
}

/// Client for the configured chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    credential_header: String,
    fallback_user_agent: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim().trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            credential_header: config.credential_header.clone(),
            fallback_user_agent: config.fallback_user_agent.clone(),
        }
    }

    /// Target URL for an inbound path. Existing query parameters are kept
    /// and `api-version` is appended after them.
    pub fn target_url(&self, path_and_query: &str) -> Result<Url, UpstreamError> {
        let path_and_query = if path_and_query.is_empty() || path_and_query.starts_with('/') {
            path_and_query.to_string()
        } else {
            format!("/{}", path_and_query)
        };

        let mut url = Url::parse(&format!("{}{}", self.endpoint, path_and_query))
            .map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// POST `payload` upstream and wait for the response head.
    pub async fn send(
        &self,
        payload: &Payload,
        ctx: &CallContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.target_url(ctx.path_and_query)?;
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .header(self.credential_header.as_str(), ctx.credential)
            .header(
                USER_AGENT,
                ctx.user_agent.unwrap_or(&self.fallback_user_agent),
            )
            .body(body);
        if let Some(request_id) = ctx.request_id {
            request = request.header("x-request-id", request_id);
        }

        tracing::debug!(url = %redact(&url), "Calling upstream");
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            result = request.send() => result.map_err(UpstreamError::Connection)?,
        };
        metrics::record_upstream_latency(started);

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            return Err(UpstreamError::Status { status, body });
        }

        tracing::debug!(status = %status, "Upstream stream opened");
        Ok(UpstreamResponse { body: response })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

/// URL without query string, for logs.
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
