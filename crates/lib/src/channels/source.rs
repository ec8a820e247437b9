//! Event source: "produce next event" over whatever feeds the router.

use crate::channels::inbound::InboundEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sequential producer of inbound events. `None` means the stream is finished.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<InboundEvent>;
}

#[async_trait]
impl EventSource for mpsc::Receiver<InboundEvent> {
    async fn next_event(&mut self) -> Option<InboundEvent> {
        self.recv().await
    }
}
