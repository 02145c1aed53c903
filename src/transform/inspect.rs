//! Read-only inspection of inbound payloads for request logging.

use serde_json::Value;

use crate::transform::payload::{Payload, Shape};

/// The parts of a payload worth recording about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadInfo {
    pub model: Option<String>,
    pub message_count: usize,
    pub tools: Vec<String>,
}

impl PayloadInfo {
    pub fn from_payload(payload: &Payload) -> Self {
        let message_count = match Shape::detect(payload) {
            Shape::Prompt => 1,
            Shape::Messages => payload
                .get("messages")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        };

        let tools = payload
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| tools.iter().map(tool_name).collect())
            .unwrap_or_default();

        Self {
            model: payload.get("model").and_then(Value::as_str).map(str::to_owned),
            message_count,
            tools,
        }
    }
}

fn tool_name(tool: &Value) -> String {
    tool.pointer("/function/name")
        .or_else(|| tool.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}
