//! Slack channel: rtm.connect + websocket read loop, and chat.postMessage via the Web API.

use crate::channels::inbound::{InboundEvent, MessageEvent};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Upper bound for one Web API call; the consume loop waits on chat.postMessage.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error codes from rtm.connect that retrying with the same token cannot fix.
const AUTH_ERROR_CODES: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
];

/// Web API failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Token rejected (invalid_auth and friends).
    #[error("slack rejected credentials: {0}")]
    Auth(String),
    #[error("slack request failed: {0}")]
    Request(String),
    /// `ok: false` with any other error code.
    #[error("slack {method} returned error: {code}")]
    Api { method: &'static str, code: String },
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Minimal Slack Web API client bound to one bot token.
#[derive(Clone)]
pub struct SlackApi {
    base: String,
    token: String,
    client: reqwest::Client,
}

impl SlackApi {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_timeout(base, token, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("slack: http client with timeout unavailable ({}), using default", e);
                reqwest::Client::new()
            });
        Self {
            base: base.into(),
            token: token.into(),
            client,
        }
    }

    async fn call(
        &self,
        method: &'static str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/{}", self.base, method);
        let mut req = self.client.post(&url).bearer_auth(&self.token);
        if let Some(b) = body {
            req = req.json(b);
        }
        let res = req
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Request(format!("{} {} {}", method, status, body)));
        }
        let data: ApiResponse = res
            .json()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if data.ok {
            return Ok(data);
        }
        let code = data.error.unwrap_or_else(|| "unknown_error".to_string());
        if AUTH_ERROR_CODES.contains(&code.as_str()) {
            Err(ApiError::Auth(code))
        } else {
            Err(ApiError::Api { method, code })
        }
    }

    /// Call rtm.connect and return the websocket URL for a new session.
    pub async fn rtm_connect(&self) -> Result<String, ApiError> {
        let data = self.call("rtm.connect", None).await?;
        data.url.ok_or_else(|| ApiError::Api {
            method: "rtm.connect",
            code: "missing_url".to_string(),
        })
    }

    /// Post a message (optionally with legacy attachments) to a channel.
    pub async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        attachments: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        let mut body = serde_json::json!({ "channel": channel_id, "text": text });
        if let Some(a) = attachments {
            body["attachments"] = a;
        }
        self.call("chat.postMessage", Some(&body)).await?;
        Ok(())
    }
}

/// Classify one RTM text frame.
pub fn parse_frame(text: &str) -> InboundEvent {
    let raw: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("rtm: unparseable frame: {}", e);
            return InboundEvent::Other {
                kind: "unparseable".to_string(),
            };
        }
    };
    let kind = raw
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string();
    match kind.as_str() {
        "message" => match serde_json::from_value::<MessageEvent>(raw) {
            Ok(m) => InboundEvent::Message(m),
            Err(e) => {
                log::debug!("rtm: malformed message frame: {}", e);
                InboundEvent::Other {
                    kind: "message".to_string(),
                }
            }
        },
        "error" => {
            let msg = raw
                .pointer("/error/msg")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown rtm error");
            InboundEvent::ConnectionError {
                message: format!("rtm error: {}", msg),
            }
        }
        // Frames without a type are replies to messages sent on the socket.
        "" => InboundEvent::Other {
            kind: "reply".to_string(),
        },
        other => InboundEvent::Other {
            kind: other.to_string(),
        },
    }
}

/// Why a websocket session ended.
enum SessionEnd {
    Disconnected(String),
    /// The event receiver was dropped; nobody is listening anymore.
    ReceiverClosed,
}

/// RTM connection manager: connects, forwards events in order, and reconnects with backoff.
pub struct RtmConnection {
    api: SlackApi,
}

impl RtmConnection {
    pub fn new(api: SlackApi) -> Self {
        Self { api }
    }

    /// Spawn the connection loop. Events go to `tx` in arrival order; the task ends after
    /// an auth failure or once the receiver is dropped.
    pub fn start(self, tx: mpsc::Sender<InboundEvent>) -> JoinHandle<()> {
        log::info!("slack channel: starting rtm connection manager");
        tokio::spawn(async move {
            manage_connection(self.api, tx).await;
        })
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

async fn manage_connection(api: SlackApi, tx: mpsc::Sender<InboundEvent>) {
    let mut connection_count: u32 = 0;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let failure = match api.rtm_connect().await {
            Err(ApiError::Auth(code)) => {
                log::debug!("rtm.connect rejected credentials: {}", code);
                let _ = tx.send(InboundEvent::AuthError).await;
                break;
            }
            Err(e) => e.to_string(),
            Ok(url) => match tokio_tungstenite::connect_async(&url).await {
                Err(e) => format!("websocket connect failed: {}", e),
                Ok((ws, _)) => {
                    connection_count += 1;
                    backoff = INITIAL_BACKOFF;
                    if tx
                        .send(InboundEvent::Connected { connection_count })
                        .await
                        .is_err()
                    {
                        break;
                    }
                    match read_session(ws, &tx).await {
                        SessionEnd::ReceiverClosed => break,
                        SessionEnd::Disconnected(reason) => reason,
                    }
                }
            },
        };
        if tx
            .send(InboundEvent::ConnectionError { message: failure })
            .await
            .is_err()
        {
            break;
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
    log::info!("slack channel: rtm connection manager stopped");
}

async fn read_session(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: &mpsc::Sender<InboundEvent>,
) -> SessionEnd {
    let (mut write, mut read) = ws.split();
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                log::debug!("rtm frame: {}", text);
                if tx.send(parse_frame(&text)).await.is_err() {
                    log::debug!("slack: event receiver closed, stopping read loop");
                    return SessionEnd::ReceiverClosed;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                return SessionEnd::Disconnected("connection closed by server".to_string());
            }
            Ok(_) => {}
            Err(e) => return SessionEnd::Disconnected(format!("websocket read error: {}", e)),
        }
    }
    SessionEnd::Disconnected("websocket stream ended".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_frame_becomes_message_event() {
        let ev = parse_frame(
            r#"{"type":"message","channel":"C123","user":"U001","text":"hi","ts":"1700000000.000100"}"#,
        );
        assert_eq!(
            ev,
            InboundEvent::Message(MessageEvent {
                channel_id: "C123".to_string(),
                user_id: "U001".to_string(),
                text: "hi".to_string(),
                timestamp: "1700000000.000100".to_string(),
                subtype: None,
            })
        );
    }

    #[test]
    fn message_subtype_is_kept() {
        let ev = parse_frame(r#"{"type":"message","subtype":"channel_join","channel":"C1"}"#);
        match ev {
            InboundEvent::Message(m) => {
                assert_eq!(m.subtype.as_deref(), Some("channel_join"));
                assert_eq!(m.user_id, "");
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn error_frame_is_connection_error() {
        let ev = parse_frame(r#"{"type":"error","error":{"code":1,"msg":"Socket URL has expired"}}"#);
        assert_eq!(
            ev,
            InboundEvent::ConnectionError {
                message: "rtm error: Socket URL has expired".to_string()
            }
        );
    }

    #[test]
    fn unknown_types_are_other() {
        assert_eq!(
            parse_frame(r#"{"type":"presence_change","user":"U1"}"#),
            InboundEvent::Other {
                kind: "presence_change".to_string()
            }
        );
        assert_eq!(
            parse_frame(r#"{"ok":true,"reply_to":1}"#),
            InboundEvent::Other {
                kind: "reply".to_string()
            }
        );
        assert_eq!(
            parse_frame("not json"),
            InboundEvent::Other {
                kind: "unparseable".to_string()
            }
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(next_backoff(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(40)), MAX_BACKOFF);
        assert_eq!(next_backoff(MAX_BACKOFF), MAX_BACKOFF);
    }
}
