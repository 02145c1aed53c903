//! Request handlers.
//!
//! # Proxy Request States
//! ```text
//! ReadingBody ──bad body/JSON──▶ 400 ─────────────────────────────┐
//!     │                                                           │
//!     ▼                                                           │
//! Transforming (always succeeds)                                  │
//!     │                                                           │
//!     ▼                                                           ▼
//! AwaitingUpstream ──connection error / non-2xx──▶ 502 ────────▶ Done
//!     │                                                           ▲
//!     ▼ 2xx                                                       │
//! StreamingToClient (200 head committed, relay task owns body) ───┘
//! ```
//!
//! Error statuses can only be produced before the handler returns; after
//! that the head is committed and the relay can only end the body.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{Html, IntoResponse, Response};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::diagnostics::{mask_credential, render_status_page, DiagnosticsState, RequestSummary, StatusView};
use crate::http::request::{bearer_token, request_id, resolve_credential, user_agent};
use crate::http::response::{sse_response, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics::{self, outcome};
use crate::sse::{relay, EventSink, RelayOutcome};
use crate::transform::{transform, Payload, PayloadInfo};
use crate::upstream::{CallContext, UpstreamResponse};

/// `POST <any path>`: transform the payload and relay the upstream stream.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let headers = &parts.headers;
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let request_id = request_id(headers);
    let user_agent = user_agent(headers);

    // ReadingBody
    let bytes = match axum::body::to_bytes(body, state.config.listener.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = ?request_id, error = %e, "Failed to read request body");
            metrics::record_request(outcome::CLIENT_ERROR);
            return ApiError::unreadable_body().into_response();
        }
    };
    let inbound: Payload = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(request_id = ?request_id, error = %e, "Invalid JSON from client");
            metrics::record_request(outcome::CLIENT_ERROR);
            return ApiError::invalid_json().into_response();
        }
    };

    let caller_credential = bearer_token(headers);
    let credential = resolve_credential(headers, state.config.upstream.api_key.as_deref());
    let info = PayloadInfo::from_payload(&inbound);
    tracing::info!(
        request_id = ?request_id,
        url = %path_and_query,
        user_agent = ?user_agent,
        credential = %mask_credential(Some(credential)),
        caller_credential = caller_credential.is_some(),
        model = ?info.model,
        messages = info.message_count,
        tools = ?info.tools,
        "Proxying chat completion"
    );
    state.diagnostics.record(
        RequestSummary::new(path_and_query, user_agent, Some(credential), info)
            .with_request_id(request_id),
    );

    // Transforming
    let outbound = transform(inbound);

    // AwaitingUpstream. If this future is dropped (client gone before the
    // head is sent) the guard cancels the token. Server shutdown cancels it
    // through the parent.
    let cancel = state.streams.child_token();
    let guard = cancel.clone().drop_guard();
    let ctx = CallContext {
        path_and_query,
        credential,
        user_agent,
        request_id,
    };

    let upstream = match state.upstream.send(&outbound, &ctx, &cancel).await {
        Ok(upstream) => upstream,
        Err(e) if e.is_cancelled() => {
            tracing::debug!(request_id = ?request_id, "Upstream call cancelled before it responded");
            metrics::record_request(outcome::CANCELLED);
            return ApiError::from_upstream(&e).into_response();
        }
        Err(e) => {
            tracing::warn!(
                request_id = ?request_id,
                status = ?e.status(),
                error = %e,
                "Upstream call failed"
            );
            state.diagnostics.mark_failure();
            metrics::record_request(outcome::UPSTREAM_ERROR);
            return ApiError::from_upstream(&e).into_response();
        }
    };

    // StreamingToClient
    let span = tracing::info_span!("relay", request_id = request_id.unwrap_or("-"));
    let (sink, body) = EventSink::channel();
    let cancel = guard.disarm();
    tokio::spawn(
        stream_to_client(upstream, sink, cancel, state.diagnostics.clone()).instrument(span),
    );

    sse_response(body)
}

async fn stream_to_client(
    upstream: UpstreamResponse,
    sink: EventSink,
    cancel: CancellationToken,
    diagnostics: Arc<DiagnosticsState>,
) {
    match relay(upstream.into_body(), sink, cancel).await {
        RelayOutcome::Completed(stats) => {
            diagnostics.mark_success();
            metrics::record_request(outcome::STREAMED);
            tracing::info!(
                forwarded = stats.forwarded,
                dropped = stats.dropped,
                "Stream completed"
            );
        }
        RelayOutcome::Cancelled(stats) => {
            metrics::record_request(outcome::CANCELLED);
            tracing::debug!(
                forwarded = stats.forwarded,
                "Stream cancelled; upstream stream aborted"
            );
        }
        RelayOutcome::Failed { stats, .. } => {
            diagnostics.mark_failure();
            metrics::record_request(outcome::STREAM_FAULT);
            tracing::debug!(forwarded = stats.forwarded, "Stream ended early");
        }
    }
}

/// `GET /health`
pub async fn health_check() -> &'static str {
    "OK"
}

/// `GET /` and `GET /status`
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let probe = state.probe.check().await;
    let view = StatusView {
        version: env!("CARGO_PKG_VERSION"),
        endpoint: state.upstream.endpoint().to_string(),
        api_version: state.upstream.api_version().to_string(),
        has_default_credential: state.config.upstream.api_key.is_some(),
        last_outcome: state.diagnostics.last_outcome(),
        total_requests: state.diagnostics.total_requests(),
        probe,
        recent: state.diagnostics.recent(),
    };
    Html(render_status_page(&view))
}

/// Path exists but not for this method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
