use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};

/// Raw entropy per token value. 32 bytes hex-encoded gives a fixed 64-char
/// plaintext value.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// Generate an opaque, unguessable token value.
///
/// The plaintext is handed to the client exactly once; only its hash is ever
/// persisted.
pub fn generate_value() -> Result<String, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::Entropy(e.to_string()))?;

    Ok(hex::encode(bytes))
}

/// SHA-256 of the plaintext value, hex-encoded. This is what the token store
/// indexes on.
pub fn hash_value(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
