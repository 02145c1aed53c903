//! Reachability probe used by the status page.
//!
//! # Responsibilities
//! - Issue a single short-timeout request to the configured endpoint
//! - Report whether anything answered, and with which status
//!
//! # Design Decisions
//! - Any HTTP response counts as reachable; a 401/404 still proves the
//!   endpoint is up
//! - Separate client so the probe timeout never applies to streaming calls

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time;

use crate::config::UpstreamConfig;

/// Result of one probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub reachable: bool,
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Probes the upstream endpoint with a short timeout.
#[derive(Debug, Clone)]
pub struct UpstreamProbe {
    client: reqwest::Client,
    endpoint: String,
    credential_header: String,
    credential: Option<String>,
    timeout: Duration,
}

impl UpstreamProbe {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim().to_string(),
            credential_header: config.credential_header.clone(),
            credential: config.api_key.clone(),
            timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    pub async fn check(&self) -> ProbeResult {
        let started = Instant::now();

        let mut request = self
            .client
            .get(&self.endpoint)
            .header("user-agent", "sse-chat-proxy-status-check");
        if let Some(credential) = &self.credential {
            request = request.header(self.credential_header.as_str(), credential.as_str());
        }

        let outcome = time::timeout(self.timeout, request.send()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(response)) => ProbeResult {
                reachable: true,
                status: Some(response.status().as_u16()),
                latency_ms,
                error: None,
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Upstream probe failed: connection error");
                ProbeResult {
                    reachable: false,
                    status: None,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Upstream probe failed: timeout");
                ProbeResult {
                    reachable: false,
                    status: None,
                    latency_ms,
                    error: Some(format!("timed out after {} ms", self.timeout.as_millis())),
                }
            }
        }
    }
}
