//! Upstream call failures.

use axum::http::StatusCode;

/// Why an upstream call produced no stream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// DNS, TCP, TLS or protocol failure before a response head arrived.
    #[error("{0}")]
    Connection(#[source] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("{} {}\n{body}", .status.as_u16(), .status.canonical_reason().unwrap_or(""))]
    Status { status: StatusCode, body: String },

    /// The downstream client went away; the call was abandoned.
    #[error("request cancelled by downstream disconnect")]
    Cancelled,

    /// The configured endpoint and inbound path do not form a URL.
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),

    /// The outbound payload could not be serialized.
    #[error("failed to encode upstream payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Cancellation is normal control flow and is never reported.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UpstreamError::Cancelled)
    }

    /// Upstream status when it answered with one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_echoes_code_reason_and_body() {
        let err = UpstreamError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "{\"error\":\"slow down\"}".into(),
        };
        assert_eq!(err.to_string(), "429 Too Many Requests\n{\"error\":\"slow down\"}");
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(UpstreamError::Cancelled.is_cancelled());
        assert_eq!(UpstreamError::Cancelled.status(), None);
    }
}
