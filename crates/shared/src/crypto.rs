//! Cryptographic utilities for invitation token generation and hashing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix carried by every invitation token.
pub const INVITATION_TOKEN_PREFIX: &str = "inv_";

/// Number of random bytes behind an invitation token.
const TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new single-use invitation token.
///
/// The raw token is only ever shown to the inviter and the invitee; the
/// database keeps its [`sha256_hex`] digest.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", INVITATION_TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Returns true if the string has the shape of an invitation token.
pub fn looks_like_invitation_token(token: &str) -> bool {
    token
        .strip_prefix(INVITATION_TOKEN_PREFIX)
        .map(|rest| {
            rest.len() == 43
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or(false)
}
