//! Message handler: relevance filter for message events plus the injectable downstream action.

use crate::channels::{MessageEvent, SlackApi};
use crate::config::{BotIdentity, ChannelTarget};
use async_trait::async_trait;
use std::sync::Arc;

/// Callback id carried by the prompt attachment; interaction callbacks echo it back.
pub const PROMPT_CALLBACK_ID: &str = "bridge_prompt";

/// Downstream work for a message that passed the relevance filter.
#[async_trait]
pub trait MessageAction: Send + Sync {
    async fn on_relevant_message(&self, event: &MessageEvent) -> anyhow::Result<()>;
}

/// Downstream failure, tagged with the message it happened on.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handling message {ts} in {channel}: {reason}")]
    Downstream {
        channel: String,
        ts: String,
        reason: String,
    },
}

/// Scoped to one channel; ignores messages written by the bot itself.
pub struct MessageHandler {
    identity: BotIdentity,
    target: ChannelTarget,
    action: Arc<dyn MessageAction>,
}

impl MessageHandler {
    pub fn new(identity: BotIdentity, target: ChannelTarget, action: Arc<dyn MessageAction>) -> Self {
        Self {
            identity,
            target,
            action,
        }
    }

    /// True when the message is in the target channel and not self-authored.
    pub fn is_relevant(&self, event: &MessageEvent) -> bool {
        event.channel_id == self.target.channel_id && event.user_id != self.identity.self_id
    }

    pub async fn handle_message_event(&self, event: &MessageEvent) -> Result<(), HandlerError> {
        if !self.is_relevant(event) {
            return Ok(());
        }
        self.action
            .on_relevant_message(event)
            .await
            .map_err(|e| HandlerError::Downstream {
                channel: event.channel_id.clone(),
                ts: event.timestamp.clone(),
                reason: format!("{:#}", e),
            })
    }
}

/// Default action: reply in the channel with an interactive attachment (acknowledge / dismiss).
pub struct AttachmentPrompt {
    api: SlackApi,
}

impl AttachmentPrompt {
    pub fn new(api: SlackApi) -> Self {
        Self { api }
    }
}

/// Attachment with two buttons; clicking one sends an interaction callback to the gateway.
pub fn prompt_attachments(event: &MessageEvent) -> serde_json::Value {
    serde_json::json!([{
        "text": format!("<@{}> wrote: {}", event.user_id, event.text),
        "fallback": "This client does not support interactive messages.",
        "callback_id": PROMPT_CALLBACK_ID,
        "attachment_type": "default",
        "actions": [
            { "name": "acknowledge", "text": "Acknowledge", "type": "button", "value": event.timestamp, "style": "primary" },
            { "name": "dismiss", "text": "Dismiss", "type": "button", "value": event.timestamp },
        ],
    }])
}

#[async_trait]
impl MessageAction for AttachmentPrompt {
    async fn on_relevant_message(&self, event: &MessageEvent) -> anyhow::Result<()> {
        // Edits, deletions, joins and bot posts carry a subtype and no top-level user;
        // prompting on them would answer our own message updates.
        if event.subtype.is_some() || event.user_id.is_empty() {
            log::debug!(
                "prompt: skipping message {} (subtype {:?})",
                event.timestamp,
                event.subtype
            );
            return Ok(());
        }
        self.api
            .post_message(&event.channel_id, "", Some(prompt_attachments(event)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::InboundEvent;
    use std::sync::Mutex;

    /// Records every message it is asked to process; fails when `fail` is set.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<MessageEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageAction for Recording {
        async fn on_relevant_message(&self, event: &MessageEvent) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            if self.fail {
                anyhow::bail!("downstream unavailable");
            }
            Ok(())
        }
    }

    fn handler(action: Arc<Recording>) -> MessageHandler {
        MessageHandler::new(
            BotIdentity {
                token: "xoxb-test".to_string(),
                self_id: "U999".to_string(),
            },
            ChannelTarget {
                channel_id: "C123".to_string(),
            },
            action,
        )
    }

    fn msg(channel: &str, user: &str) -> MessageEvent {
        MessageEvent {
            channel_id: channel.to_string(),
            user_id: user.to_string(),
            text: "hi".to_string(),
            timestamp: "1.0".to_string(),
            subtype: None,
        }
    }

    #[tokio::test]
    async fn target_channel_from_other_user_triggers_downstream() {
        let action = Arc::new(Recording::default());
        handler(action.clone())
            .handle_message_event(&msg("C123", "U001"))
            .await
            .unwrap();
        assert_eq!(action.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn self_authored_message_is_ignored() {
        let action = Arc::new(Recording::default());
        let h = handler(action.clone());
        h.handle_message_event(&msg("C123", "U999")).await.unwrap();
        h.handle_message_event(&msg("C456", "U999")).await.unwrap();
        assert!(action.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_channel_is_ignored() {
        let action = Arc::new(Recording::default());
        handler(action.clone())
            .handle_message_event(&msg("C456", "U001"))
            .await
            .unwrap();
        assert!(action.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn downstream_failure_is_wrapped() {
        let action = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let err = handler(action)
            .handle_message_event(&msg("C123", "U001"))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("C123"));
        assert!(text.contains("downstream unavailable"));
    }

    /// Nothing listens on this address, so any attempted post fails.
    fn unreachable_prompt() -> AttachmentPrompt {
        AttachmentPrompt::new(SlackApi::new("http://127.0.0.1:1", "xoxb-test"))
    }

    fn parsed_message(frame: &str) -> MessageEvent {
        match crate::channels::parse_frame(frame) {
            InboundEvent::Message(m) => m,
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn prompt_ignores_edit_of_own_message() {
        let edit = parsed_message(
            r#"{"type":"message","subtype":"message_changed","channel":"C123","ts":"2.0","message":{"user":"U999","text":"edited"}}"#,
        );
        assert!(handler(Arc::new(Recording::default())).is_relevant(&edit));
        unreachable_prompt()
            .on_relevant_message(&edit)
            .await
            .expect("edit is skipped without posting");
    }

    #[tokio::test]
    async fn prompt_ignores_bot_and_join_messages() {
        for frame in [
            r#"{"type":"message","subtype":"bot_message","bot_id":"B1","channel":"C123","text":"hi","ts":"3.0"}"#,
            r#"{"type":"message","subtype":"channel_join","user":"U001","channel":"C123","ts":"4.0"}"#,
        ] {
            unreachable_prompt()
                .on_relevant_message(&parsed_message(frame))
                .await
                .expect("subtype message is skipped without posting");
        }
    }

    #[tokio::test]
    async fn prompt_posts_for_plain_user_message() {
        let err = unreachable_prompt()
            .on_relevant_message(&msg("C123", "U001"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("slack request failed"));
    }

    #[test]
    fn prompt_carries_callback_id_and_timestamp() {
        let a = prompt_attachments(&msg("C123", "U001"));
        assert_eq!(a[0]["callback_id"], PROMPT_CALLBACK_ID);
        assert_eq!(a[0]["actions"][0]["value"], "1.0");
        assert_eq!(a[0]["actions"][1]["name"], "dismiss");
    }
}
