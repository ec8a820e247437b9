//! Shared-secret check for interaction callbacks.

use crate::config::VerificationSecret;
use subtle::ConstantTimeEq;

/// Constant-time comparison of the provided token with the configured secret.
pub fn verify_token(secret: &VerificationSecret, provided: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(secret.token.as_bytes()))
}
