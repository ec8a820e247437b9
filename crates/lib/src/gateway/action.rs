//! What happens to a verified interaction: the injectable action and the default acknowledger.

use crate::gateway::protocol::InteractionPayload;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Receives verified payloads; the returned JSON is written as the 200 response body.
#[async_trait]
pub trait InteractionAction: Send + Sync {
    async fn on_interaction(&self, payload: &InteractionPayload) -> anyhow::Result<Value>;
}

/// Default action: acknowledge the click by rewriting the original message.
pub struct ActionAcknowledger;

fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer)
        .and_then(|s| s.as_str())
        .filter(|s| !s.is_empty())
}

/// Build the acknowledgment body for a callback.
///
/// With `original_message` present the message is returned with `replace_original` set and its
/// attachments replaced by a single line saying who chose what. Otherwise only that line is sent.
pub fn acknowledgment(payload: &InteractionPayload) -> Value {
    let meta = Value::Object(payload.metadata.clone());
    let user = str_at(&meta, "/user/name")
        .or_else(|| str_at(&meta, "/user/id"))
        .unwrap_or("someone");
    let choice = str_at(&meta, "/actions/0/selected_options/0/value")
        .or_else(|| str_at(&meta, "/actions/0/value"))
        .or_else(|| str_at(&meta, "/actions/0/name"))
        .unwrap_or("nothing");
    let line = format!("{} chose {}", user, choice);

    match meta.get("original_message") {
        Some(Value::Object(original)) => {
            let mut message = original.clone();
            message.insert("replace_original".to_string(), Value::Bool(true));
            message.insert(
                "attachments".to_string(),
                json!([{ "text": line, "fallback": line }]),
            );
            Value::Object(message)
        }
        _ => json!({ "text": line }),
    }
}

#[async_trait]
impl InteractionAction for ActionAcknowledger {
    async fn on_interaction(&self, payload: &InteractionPayload) -> anyhow::Result<Value> {
        log::info!(
            "interaction accepted: callback_id={}",
            payload
                .metadata
                .get("callback_id")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
        );
        Ok(acknowledgment(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(meta: Value) -> InteractionPayload {
        let Value::Object(metadata) = meta else {
            panic!("metadata must be an object");
        };
        InteractionPayload {
            token: "secret-abc".to_string(),
            metadata,
        }
    }

    #[test]
    fn button_without_original_message() {
        let ack = acknowledgment(&payload(json!({
            "user": { "id": "U001", "name": "alice" },
            "actions": [{ "name": "acknowledge", "value": "1.0" }]
        })));
        assert_eq!(ack, json!({ "text": "alice chose 1.0" }));
    }

    #[test]
    fn select_option_wins_over_button_value() {
        let ack = acknowledgment(&payload(json!({
            "user": { "id": "U001" },
            "actions": [{ "name": "pick", "selected_options": [{ "value": "green" }] }]
        })));
        assert_eq!(ack["text"], "U001 chose green");
    }

    #[test]
    fn original_message_is_replaced() {
        let ack = acknowledgment(&payload(json!({
            "user": { "name": "bob" },
            "actions": [{ "name": "dismiss" }],
            "original_message": { "text": "", "ts": "1.0", "attachments": [{ "text": "old" }] }
        })));
        assert_eq!(ack["replace_original"], true);
        assert_eq!(ack["ts"], "1.0");
        assert_eq!(ack["attachments"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(ack["attachments"][0]["text"], "bob chose dismiss");
    }

    #[test]
    fn empty_metadata_still_acknowledges() {
        let ack = acknowledgment(&payload(json!({})));
        assert_eq!(ack, json!({ "text": "someone chose nothing" }));
    }
}
