//! SSE line reassembly and per-line filtering.
//!
//! # Responsibilities
//! - Rebuild newline-terminated lines from arbitrarily split byte chunks
//! - Classify each line (blank, comment, data, other)
//! - Decide what, if anything, is written downstream for it
//!
//! # Design Decisions
//! - Bytes are buffered undecoded and split on `\n`; a newline byte never
//!   occurs inside a multi-byte UTF-8 sequence, so a character split across
//!   chunks is always whole by the time its line is decoded
//! - A trailing `\r` is stripped before classification

use std::borrow::Cow;

use serde_json::Value;

/// Output written for a `[DONE]` sentinel.
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Accumulates bytes that have not yet formed a complete line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the upstream body.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Remove and return the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(decode(&line[..line.len() - 1]))
    }

    /// Take whatever is left once the stream has ended. Returns `None` when
    /// the stream ended exactly on a line boundary.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode(&rest))
    }

    /// Number of bytes waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Payload of a `data:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    /// The `[DONE]` sentinel.
    Done,
    /// Nothing after the field name.
    Empty,
    /// A JSON value.
    Json(Value),
    /// Anything that is not JSON.
    Text,
}

/// One line of an SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine<'a> {
    /// Event boundary.
    Blank,
    /// `:`-prefixed comment (often a keepalive).
    Comment(&'a str),
    /// `data:` field.
    Data(DataPayload),
    /// Any other field (`event:`, `id:`, `retry:`, ...).
    Other(&'a str),
}

impl<'a> SseLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        if line.is_empty() {
            return SseLine::Blank;
        }
        if line.starts_with(':') {
            return SseLine::Comment(line);
        }
        let Some(rest) = line.strip_prefix("data:") else {
            return SseLine::Other(line);
        };

        let payload = rest.trim();
        let data = if payload == "[DONE]" {
            DataPayload::Done
        } else if payload.is_empty() {
            DataPayload::Empty
        } else {
            match serde_json::from_str(payload) {
                Ok(value) => DataPayload::Json(value),
                Err(_) => DataPayload::Text,
            }
        };
        SseLine::Data(data)
    }
}

/// Text to write downstream for `line`, or `None` to drop it.
pub fn render(line: &str) -> Option<Cow<'_, str>> {
    match SseLine::parse(line) {
        SseLine::Blank => Some(Cow::Borrowed("\n")),
        SseLine::Data(DataPayload::Done) => Some(Cow::Borrowed(DONE_EVENT)),
        SseLine::Data(DataPayload::Empty) => None,
        SseLine::Data(DataPayload::Json(value)) if has_empty_choices(&value) => None,
        SseLine::Data(_) | SseLine::Comment(_) | SseLine::Other(_) => {
            Some(Cow::Owned(format!("{line}\n")))
        }
    }
}

/// Keepalive chunks carry `"choices": []`. Only a real JSON array of length
/// zero counts; objects and other types are forwarded.
fn has_empty_choices(value: &Value) -> bool {
    matches!(value.get("choices"), Some(Value::Array(choices)) if choices.is_empty())
}
