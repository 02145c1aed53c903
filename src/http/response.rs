//! Response construction.
//!
//! # Responsibilities
//! - Map client and upstream failures to plain-text HTTP errors
//! - Build the streaming SSE response head
//!
//! # Design Decisions
//! - Errors are only produced before the response head is committed; once
//!   streaming starts, failures end the body instead
//! - Upstream failures are 502 and echo the upstream status and body

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::upstream::UpstreamError;

/// Prefix of every 502 body.
pub const UPSTREAM_ERROR_PREFIX: &str = "Error communicating with upstream";

/// Nginx-style status for a client that went away; never actually seen.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// A plain-text error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_json() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid JSON from client")
    }

    pub fn unreadable_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Failed to read request body")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    pub fn from_upstream(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Encode(e) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode upstream payload: {}", e),
            ),
            UpstreamError::Cancelled => Self::new(
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_GATEWAY),
                "Client closed request",
            ),
            UpstreamError::Connection(e) => Self::new(
                StatusCode::BAD_GATEWAY,
                format!("{}: {}", UPSTREAM_ERROR_PREFIX, error_chain(e)),
            ),
            other => Self::new(
                StatusCode::BAD_GATEWAY,
                format!("{}: {}", UPSTREAM_ERROR_PREFIX, other),
            ),
        }
    }
}

/// `error: cause: cause…`, since reqwest keeps the useful part in sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            self.message,
        )
            .into_response()
    }
}

/// 200 response head for a relayed event stream.
pub fn sse_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn api_error_is_plain_text() {
        let response = ApiError::invalid_json().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Invalid JSON from client");
    }

    #[test]
    fn upstream_status_becomes_bad_gateway() {
        let err = UpstreamError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "{\"error\":{\"code\":\"401\"}}".into(),
        };
        let api = ApiError::from_upstream(&err);
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            api.message,
            "Error communicating with upstream: 401 Unauthorized\n{\"error\":{\"code\":\"401\"}}"
        );
    }

    #[tokio::test]
    async fn sse_head_has_streaming_headers() {
        let response = sse_response(Body::from("data: [DONE]\n\n"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[CONNECTION], "keep-alive");
        assert_eq!(body_text(response).await, "data: [DONE]\n\n");
    }
}
