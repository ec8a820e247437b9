//! Gateway: the interaction callback endpoint.
//!
//! One route, `POST /interaction`. Each request is decoded, its token checked against the
//! shared secret, and accepted payloads are handed to an [`InteractionAction`] whose JSON
//! acknowledgment becomes the response body.

mod action;
mod protocol;
mod server;
mod verify;

pub use action::{acknowledgment, ActionAcknowledger, InteractionAction};
pub use protocol::{decode_payload, DecodeError, InteractionPayload};
pub use server::{bind_gateway, router, Gateway, GatewayState, INTERACTION_PATH};
pub use verify::verify_token;
