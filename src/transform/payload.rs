//! Inbound → outbound chat-completion payload mapping.
//!
//! Two inbound shapes are recognised. A payload with a `prompt` key is
//! rewritten into a two-turn conversation; anything else is treated as
//! messages-shape and passed through with the system turn prepended.
//! Either way the outbound payload always streams.

use serde_json::{json, Map, Value};

/// Open-ended JSON object, insertion order preserved.
pub type Payload = Map<String, Value>;

/// Instruction injected as the first turn of every conversation.
pub const SYSTEM_PROMPT: &str = "You must always respond in markdown format.";

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u64 = 200;

/// The synthetic system turn.
pub fn system_message() -> Value {
    json!({ "role": "system", "content": SYSTEM_PROMPT })
}

/// Which inbound convention a payload follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Prompt,
    Messages,
}

impl Shape {
    /// `prompt` wins whenever present, even alongside `messages`.
    pub fn detect(payload: &Payload) -> Self {
        if payload.contains_key("prompt") {
            Shape::Prompt
        } else {
            Shape::Messages
        }
    }
}

/// Map an inbound payload to the upstream payload. Total: missing or
/// ill-typed fields fall back to defaults.
pub fn transform(inbound: Payload) -> Payload {
    match Shape::detect(&inbound) {
        Shape::Prompt => from_prompt(inbound),
        Shape::Messages => from_messages(inbound),
    }
}

fn from_prompt(inbound: Payload) -> Payload {
    let prompt = inbound.get("prompt").map(prompt_text).unwrap_or_default();

    let mut outbound = Payload::new();
    outbound.insert(
        "messages".into(),
        Value::Array(vec![
            system_message(),
            json!({ "role": "user", "content": prompt }),
        ]),
    );
    outbound.insert("temperature".into(), json!(DEFAULT_TEMPERATURE));
    outbound.insert("max_tokens".into(), json!(DEFAULT_MAX_TOKENS));
    outbound.insert("stream".into(), Value::Bool(true));

    // Caller values override the defaults; the constructed conversation
    // and the stream flag are never overridden.
    for (key, value) in inbound {
        if key == "prompt" || key == "messages" || key == "stream" {
            continue;
        }
        outbound.insert(key, value);
    }
    outbound
}

fn from_messages(inbound: Payload) -> Payload {
    let mut outbound = inbound;
    outbound.insert("stream".into(), Value::Bool(true));

    // Edited in place so the key keeps its position.
    match outbound.get_mut("messages") {
        Some(Value::Array(existing)) => existing.insert(0, system_message()),
        Some(other) => *other = Value::Array(vec![system_message()]),
        None => {
            outbound.insert("messages".into(), Value::Array(vec![system_message()]));
        }
    }
    outbound
}

/// Coerce a `prompt` value to text. Strings are taken verbatim, null is
/// empty, anything else is rendered as compact JSON.
fn prompt_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn messages(p: &Payload) -> &Vec<Value> {
        p["messages"].as_array().expect("messages must be an array")
    }

    #[test]
    fn prompt_shape_builds_two_turns() {
        let out = transform(payload(json!({ "model": "x", "prompt": "hi" })));

        assert_eq!(
            messages(&out),
            &vec![system_message(), json!({ "role": "user", "content": "hi" })]
        );
        assert_eq!(out["stream"], json!(true));
        assert_eq!(out["temperature"], json!(0.7));
        assert_eq!(out["max_tokens"], json!(200));
        assert_eq!(out["model"], json!("x"));
        assert!(!out.contains_key("prompt"));
    }

    #[test]
    fn prompt_shape_caller_values_override_defaults() {
        let out = transform(payload(json!({
            "prompt": "hi",
            "temperature": 0.1,
            "max_tokens": 4096,
            "tools": [{ "type": "function", "function": { "name": "lookup" } }],
        })));

        assert_eq!(out["temperature"], json!(0.1));
        assert_eq!(out["max_tokens"], json!(4096));
        assert_eq!(out["tools"][0]["function"]["name"], json!("lookup"));
    }

    #[test]
    fn prompt_shape_never_disables_streaming() {
        let out = transform(payload(json!({ "prompt": "hi", "stream": false })));
        assert_eq!(out["stream"], json!(true));
    }

    #[test]
    fn prompt_wins_over_messages() {
        let out = transform(payload(json!({
            "prompt": "from prompt",
            "messages": [{ "role": "user", "content": "from messages" }],
        })));

        let msgs = messages(&out);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1]["content"], json!("from prompt"));
    }

    #[test]
    fn non_string_prompt_is_coerced() {
        let out = transform(payload(json!({ "prompt": 42 })));
        assert_eq!(messages(&out)[1]["content"], json!("42"));

        let out = transform(payload(json!({ "prompt": null })));
        assert_eq!(messages(&out)[1]["content"], json!(""));
    }

    #[test]
    fn messages_shape_prepends_system_turn() {
        let original = vec![
            json!({ "role": "user", "content": "a" }),
            json!({ "role": "assistant", "content": "b" }),
        ];
        let out = transform(payload(json!({ "model": "x", "messages": original.clone() })));

        let mut expected = vec![system_message()];
        expected.extend(original);
        assert_eq!(messages(&out), &expected);
        assert_eq!(out["stream"], json!(true));
        assert_eq!(out["model"], json!("x"));
        assert!(!out.contains_key("temperature"));
    }

    #[test]
    fn messages_of_wrong_type_are_replaced() {
        for bogus in [json!("hello"), json!({ "0": { "role": "user" } }), json!(null)] {
            let out = transform(payload(json!({ "messages": bogus })));
            assert_eq!(messages(&out), &vec![system_message()]);
        }
    }

    #[test]
    fn payload_without_either_shape() {
        let out = transform(payload(json!({ "model": "x", "stream": false })));
        assert_eq!(messages(&out), &vec![system_message()]);
        assert_eq!(out["stream"], json!(true));
    }

    #[test]
    fn empty_payload() {
        let out = transform(Payload::new());
        assert_eq!(messages(&out), &vec![system_message()]);
        assert_eq!(out["stream"], json!(true));
    }

    #[test]
    fn transform_is_not_idempotent() {
        let once = transform(payload(json!({ "messages": [{ "role": "user", "content": "q" }] })));
        let twice = transform(once);

        let msgs = messages(&twice);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], system_message());
        assert_eq!(msgs[1], system_message());
    }

    #[test]
    fn extra_keys_keep_their_order() {
        let out = transform(payload(json!({ "model": "x", "prompt": "hi", "user": "u1", "n": 1 })));
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["messages", "temperature", "max_tokens", "stream", "model", "user", "n"]
        );
    }
}
