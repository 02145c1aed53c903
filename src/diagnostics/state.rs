//! Process-wide diagnostic state.
//!
//! Best-effort and in-memory only: the last request outcome and a bounded
//! log of recent request summaries. Nothing here is durable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transform::PayloadInfo;

/// Outcome of the most recent proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LastOutcome {
    Unknown,
    Succeeded,
    Failed,
}

impl LastOutcome {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LastOutcome::Succeeded,
            2 => LastOutcome::Failed,
            _ => LastOutcome::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LastOutcome::Unknown => 0,
            LastOutcome::Succeeded => 1,
            LastOutcome::Failed => 2,
        }
    }
}

/// Metadata recorded for each proxied request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<String>,
    pub url: String,
    pub user_agent: Option<String>,
    pub credential: String,
    pub model: Option<String>,
    pub message_count: usize,
    pub tools: Vec<String>,
}

impl RequestSummary {
    pub fn new(
        url: impl Into<String>,
        user_agent: Option<&str>,
        credential: Option<&str>,
        info: PayloadInfo,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: None,
            url: url.into(),
            user_agent: user_agent.map(str::to_owned),
            credential: mask_credential(credential),
            model: info.model,
            message_count: info.message_count,
            tools: info.tools,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_owned);
        self
    }
}

/// Masked form of a credential, safe to log and display.
pub fn mask_credential(credential: Option<&str>) -> String {
    match credential.map(str::trim) {
        None | Some("") => "none".to_string(),
        Some(c) if c.chars().count() > 8 => {
            let tail: String = c
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", tail)
        }
        Some(_) => "****".to_string(),
    }
}

/// Shared diagnostics, one instance per server.
#[derive(Debug)]
pub struct DiagnosticsState {
    last_outcome: AtomicU8,
    total_requests: AtomicU64,
    recent: Mutex<VecDeque<RequestSummary>>,
    capacity: usize,
}

impl DiagnosticsState {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_outcome: AtomicU8::new(LastOutcome::Unknown.as_u8()),
            total_requests: AtomicU64::new(0),
            recent: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append a summary, evicting the oldest once at capacity.
    pub fn record(&self, summary: RequestSummary) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if self.capacity == 0 {
            return;
        }
        // Poisoning is ignored; entries are independent.
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        while recent.len() >= self.capacity {
            recent.pop_front();
        }
        recent.push_back(summary);
    }

    pub fn mark_success(&self) {
        self.set_outcome(LastOutcome::Succeeded);
    }

    pub fn mark_failure(&self) {
        self.set_outcome(LastOutcome::Failed);
    }

    fn set_outcome(&self, outcome: LastOutcome) {
        self.last_outcome.store(outcome.as_u8(), Ordering::SeqCst);
    }

    pub fn last_outcome(&self) -> LastOutcome {
        LastOutcome::from_u8(self.last_outcome.load(Ordering::SeqCst))
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Recent summaries, newest first.
    pub fn recent(&self) -> Vec<RequestSummary> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent.iter().rev().cloned().collect()
    }
}
