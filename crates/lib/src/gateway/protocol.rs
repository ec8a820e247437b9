//! Interaction callback wire format.
//!
//! The platform POSTs `application/x-www-form-urlencoded` with a single `payload` field that
//! holds the callback JSON. A raw `application/json` body is accepted as well.

use serde::{Deserialize, Serialize};

/// Decoded callback: the verification token plus everything else, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPayload {
    pub token: String,
    /// Action metadata (actions, callback_id, user, channel, original_message, ...).
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FormBody {
    payload: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// Decode a request body according to its content type (form unless it says JSON).
pub fn decode_payload(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<InteractionPayload, DecodeError> {
    if is_json(content_type) {
        return Ok(serde_json::from_slice(body)?);
    }
    let form: FormBody = serde_urlencoded::from_bytes(body)?;
    Ok(serde_json::from_str(&form.payload)?)
}
