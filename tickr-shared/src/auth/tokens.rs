//! Token service
//!
//! Ties access tokens and stored refresh tokens together: login issues a
//! pair, refresh consumes the presented refresh token and issues a new pair,
//! logout and the housekeeping task delete stored refresh tokens.

use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{access_token_ttl, AccessTokens, Claims, TokenError};
use super::refresh::{generate_refresh_token, hash_refresh_token, refresh_token_ttl};
use crate::models::{NewRefreshToken, User};
use crate::store::{RefreshTokenRepository, UserRepository};

/// Tokens handed to a client after login or refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Issues, rotates and revokes tokens
#[derive(Clone)]
pub struct TokenService {
    access: AccessTokens,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl TokenService {
    pub fn new(
        access: AccessTokens,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            access,
            refresh_tokens,
            users,
            clock,
        }
    }

    /// Access token verifier shared with the auth middleware
    pub fn access_tokens(&self) -> &AccessTokens {
        &self.access
    }

    /// Validates an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.validate(token)
    }

    /// Issues an access token and persists a fresh refresh token for `user`
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let access_token = self.access.issue(user.id, &user.email, user.role)?;
        let refresh_token = generate_refresh_token();

        self.refresh_tokens
            .create(NewRefreshToken {
                user_id: user.id,
                token_hash: hash_refresh_token(&refresh_token),
                expires_at: self.clock.utc() + refresh_token_ttl(),
            })
            .await?;

        debug!(user_id = %user.id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: access_token_ttl().num_seconds(),
        })
    }

    /// Exchanges a refresh token for a new token pair
    ///
    /// The presented token is consumed atomically, so a second use of the
    /// same token fails even under concurrency. The user is reloaded so the
    /// new access token carries the current email and role.
    ///
    /// # Errors
    ///
    /// `TokenError::Invalid` if the token is unknown, expired, or its user no
    /// longer exists
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let now = self.clock.utc();
        let stored = self
            .refresh_tokens
            .consume_active(&hash_refresh_token(refresh_token), now)
            .await?
            .ok_or_else(|| TokenError::Invalid("refresh token not found or expired".to_string()))?;

        let Some(user) = self.users.find_by_id(stored.user_id).await? else {
            warn!(user_id = %stored.user_id, "Refresh token belongs to a missing user");
            return Err(TokenError::Invalid("user no longer exists".to_string()));
        };

        self.issue_pair(&user).await
    }

    /// Deletes every refresh token of a user; returns how many went away
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, TokenError> {
        let removed = self.refresh_tokens.delete_for_user(user_id).await?;
        info!(user_id = %user_id, removed, "Revoked refresh tokens");
        Ok(removed)
    }

    /// Deletes one refresh token; unknown tokens are not an error
    pub async fn revoke_one(&self, refresh_token: &str) -> Result<u64, TokenError> {
        Ok(self
            .refresh_tokens
            .delete(&hash_refresh_token(refresh_token))
            .await?)
    }

    /// Deletes every expired refresh token
    pub async fn purge_expired(&self) -> Result<u64, TokenError> {
        Ok(self.refresh_tokens.delete_expired(self.clock.utc()).await?)
    }
}
