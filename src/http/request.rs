//! Inbound request inspection.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the caller sent none
//! - Resolve the credential forwarded upstream
//! - Extract the caller's user agent
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller-supplied bearer token always wins over the configured default
//! - Empty or whitespace-only header values count as absent

use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Correlation header set on every request and response.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Token from the `Authorization` header: `Bearer <token>` (scheme
/// case-insensitive) or a bare token. Other schemes yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, &AUTHORIZATION)?;
    match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = rest.trim();
            (!token.is_empty()).then_some(token)
        }
        Some(_) => None,
        None if value.eq_ignore_ascii_case("bearer") => None,
        None => Some(value),
    }
}

/// Credential forwarded upstream: the caller's token, else the configured
/// default, else empty.
pub fn resolve_credential<'a>(headers: &'a HeaderMap, default: Option<&'a str>) -> &'a str {
    bearer_token(headers).or(default).unwrap_or("")
}

pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &USER_AGENT)
}

pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &X_REQUEST_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn bearer_token_wins_over_default() {
        let h = headers(&[("authorization", "Bearer  caller-key ")]);
        assert_eq!(resolve_credential(&h, Some("default-key")), "caller-key");
    }

    #[test]
    fn scheme_is_case_insensitive_and_optional() {
        assert_eq!(bearer_token(&headers(&[("authorization", "bearer abc")])), Some("abc"));
        assert_eq!(bearer_token(&headers(&[("authorization", "abc")])), Some("abc"));
    }

    #[test]
    fn other_schemes_fall_back_to_default() {
        let h = headers(&[("authorization", "Basic dXNlcjpwdw==")]);
        assert_eq!(bearer_token(&h), None);
        assert_eq!(resolve_credential(&h, Some("default-key")), "default-key");

        let h = headers(&[("authorization", "Digest username=\"u\", realm=\"r\"")]);
        assert_eq!(resolve_credential(&h, None), "");
    }

    #[test]
    fn blank_authorization_falls_back() {
        let h = headers(&[("authorization", "   ")]);
        assert_eq!(resolve_credential(&h, Some("default-key")), "default-key");

        let h = headers(&[("authorization", "Bearer ")]);
        assert_eq!(resolve_credential(&h, Some("default-key")), "default-key");
    }

    #[test]
    fn no_credential_at_all_is_empty() {
        assert_eq!(resolve_credential(&HeaderMap::new(), None), "");
    }

    #[test]
    fn user_agent_and_request_id() {
        let h = headers(&[("user-agent", "Zed/0.178.5"), ("x-request-id", "abc")]);
        assert_eq!(user_agent(&h), Some("Zed/0.178.5"));
        assert_eq!(request_id(&h), Some("abc"));
        assert_eq!(user_agent(&HeaderMap::new()), None);
    }

    #[test]
    fn generates_uuid_request_ids() {
        let request = Request::new(());
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
