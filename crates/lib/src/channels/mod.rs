//! Slack connection: RTM websocket manager, Web API client, and the inbound event model.
//!
//! The connection manager runs on its own task and feeds [`InboundEvent`]s into a channel;
//! consumers read them through the [`EventSource`] trait so tests can substitute any source.

mod inbound;
mod slack;
mod source;

pub use inbound::{InboundEvent, MessageEvent};
pub use slack::{parse_frame, ApiError, RtmConnection, SlackApi};
pub use source::EventSource;
