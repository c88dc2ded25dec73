//! Refresh token record
//!
//! Only the SHA-256 digest of the opaque token is stored. The plaintext is
//! returned to the client once and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Unique record ID
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    /// Hex-encoded SHA-256 of the opaque token
    pub token_hash: String,

    /// After this instant the token is dead
    pub expires_at: DateTime<Utc>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Whether the token is still usable at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Input for persisting a refresh token
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
