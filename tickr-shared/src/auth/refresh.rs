//! Opaque refresh tokens
//!
//! A refresh token is 32 bytes from the OS CSPRNG, hex-encoded to 64
//! characters. It carries no claims. The server only ever stores the
//! SHA-256 digest, so a leaked table cannot be replayed.

use chrono::Duration;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes per refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// How long a refresh token stays usable
pub fn refresh_token_ttl() -> Duration {
    Duration::days(7)
}

/// Generates a new opaque refresh token
///
/// # Example
///
/// ```
/// use tickr_shared::auth::refresh::generate_refresh_token;
///
/// let token = generate_refresh_token();
/// assert_eq!(token.len(), 64);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex-encoded SHA-256 of a refresh token, used as its storage key
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
