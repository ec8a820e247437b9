//! Event router: classify each inbound event and dispatch it to the one matching handler.
//!
//! Events are routed strictly in the order the source yields them. The router itself never
//! fails; an invalid-credentials event is the only thing that stops the consume loop.

use crate::channels::{EventSource, InboundEvent};
use crate::handler::MessageHandler;
use std::ops::ControlFlow;

/// Runtime condition that ends the consume loop and, in the binary, the process.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FatalError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("event stream closed")]
    StreamClosed,
}

pub struct EventRouter {
    messages: MessageHandler,
}

impl EventRouter {
    pub fn new(messages: MessageHandler) -> Self {
        Self { messages }
    }

    /// Route one event. `Break` means stop consuming.
    pub async fn route(&self, event: InboundEvent) -> ControlFlow<FatalError> {
        log::debug!("event received: {}", event.kind());
        match event {
            InboundEvent::Connected { connection_count } => {
                log::info!("connection counter: {}", connection_count);
            }
            InboundEvent::Message(ev) => {
                if let Err(e) = self.messages.handle_message_event(&ev).await {
                    log::error!("{}", e);
                }
            }
            InboundEvent::ConnectionError { message } => {
                log::warn!("{}", message);
            }
            InboundEvent::AuthError => {
                log::debug!("invalid credentials event, stopping consume loop");
                return ControlFlow::Break(FatalError::InvalidCredentials);
            }
            InboundEvent::Other { .. } => {}
        }
        ControlFlow::Continue(())
    }

    /// Consume the source until a fatal event or the end of the stream.
    pub async fn run<S: EventSource>(&self, source: &mut S) -> FatalError {
        while let Some(event) = source.next_event().await {
            if let ControlFlow::Break(fatal) = self.route(event).await {
                return fatal;
            }
        }
        FatalError::StreamClosed
    }
}
