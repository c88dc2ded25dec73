//! Access token issuance and validation
//!
//! Access tokens are short-lived HS256 JWTs carrying the caller's identity
//! and role. They are never persisted; revocation happens by letting them
//! expire and refusing to refresh.
//!
//! # Claims
//!
//! - `sub`: user ID as a string (must equal `user_id`)
//! - `user_id`, `email`, `role`: identity used by the authorization policy
//! - `iss`: always `"tickr"`
//! - `iat`, `nbf`, `exp`: Unix timestamps, `exp = iat + 15 minutes`
//!
//! # Time
//!
//! Issuance and expiry both read an injected [`mockable::Clock`] instead of
//! the system time, so expiry can be tested without sleeping. The library's
//! own `exp`/`nbf` checks are disabled for that reason and performed here.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mockable::DefaultClock;
//! use tickr_shared::auth::jwt::AccessTokens;
//! use tickr_shared::models::Role;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = AccessTokens::new("a-secret-key-of-at-least-32-bytes!!", Arc::new(DefaultClock))?;
//! let user_id = Uuid::new_v4();
//!
//! let token = tokens.issue(user_id, "ada@example.com", Role::User)?;
//! let claims = tokens.validate(&token)?;
//! assert_eq!(claims.user_id, user_id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;
use crate::store::StoreError;

/// Issuer claim on every access token
pub const TOKEN_ISSUER: &str = "tickr";

/// Access token lifetime
pub fn access_token_ttl() -> Duration {
    Duration::minutes(15)
}

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token was well-formed and correctly signed but its expiry has passed
    #[error("Token has expired")]
    Expired,

    /// Any other reason the token is not acceptable
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Signing key or claim set could not be used
    #[error("Token configuration error: {0}")]
    Config(String),

    /// Refresh token storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID as a string
    pub sub: String,

    /// User ID
    pub user_id: Uuid,

    /// Email at issuance time
    pub email: String,

    /// Role at issuance time
    pub role: String,

    /// Issuer - always "tickr"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// HS256 access token signer/verifier
#[derive(Clone)]
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for AccessTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokens")
            .field("algorithm", &Algorithm::HS256)
            .field("issuer", &TOKEN_ISSUER)
            .finish_non_exhaustive()
    }
}

impl AccessTokens {
    /// Creates a signer/verifier for `secret`
    ///
    /// # Errors
    ///
    /// `TokenError::Config` if the secret is empty
    pub fn new(secret: &str, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Config("signing secret is empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    /// Issues a 15-minute access token
    ///
    /// # Errors
    ///
    /// `TokenError::Config` if encoding fails
    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String, TokenError> {
        let now = self.clock.utc();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            role: role.as_str().to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + access_token_ttl()).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Config(format!("Token encoding failed: {}", e)))
    }

    /// Validates a token and returns its claims
    ///
    /// Checks in order: signature and algorithm, issuer, expiry, not-before,
    /// subject/user ID agreement.
    ///
    /// # Errors
    ///
    /// `TokenError::Expired` once `exp` has passed, `TokenError::Invalid` for
    /// everything else
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        let now = self.clock.utc().timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::Invalid("token not yet valid".to_string()));
        }
        if claims.sub != claims.user_id.to_string() {
            return Err(TokenError::Invalid(
                "subject does not match user id".to_string(),
            ));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::Utc;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn fixture() -> (Arc<MutableClock>, AccessTokens) {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let tokens = AccessTokens::new(SECRET, clock.clone()).unwrap();
        (clock, tokens)
    }

    #[test]
    fn test_issue_and_validate() {
        let (_, tokens) = fixture();
        let user_id = Uuid::new_v4();

        let token = tokens.issue(user_id, "ada@example.com", Role::Organizer).unwrap();
        let claims = tokens.validate(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, "organizer");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_token_expires_after_fifteen_minutes() {
        let (clock, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4(), "a@b.co", Role::User).unwrap();

        clock.advance_minutes(14);
        assert!(tokens.validate(&token).is_ok());

        clock.advance_minutes(2);
        assert!(matches!(tokens.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_different_key_is_invalid() {
        let (clock, tokens) = fixture();
        let other = AccessTokens::new("another-secret-key-of-32-bytes-plus", clock).unwrap();

        let token = other.issue(Uuid::new_v4(), "a@b.co", Role::User).unwrap();
        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_with_wrong_key_is_invalid_not_expired() {
        let (clock, tokens) = fixture();
        let other = AccessTokens::new("another-secret-key-of-32-bytes-plus", clock.clone()).unwrap();

        let token = other.issue(Uuid::new_v4(), "a@b.co", Role::User).unwrap();
        clock.advance_minutes(60);
        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_different_algorithm_is_invalid() {
        let (clock, tokens) = fixture();
        let now = clock.utc();
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: "a@b.co".to_string(),
            role: "admin".to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(15)).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let (clock, tokens) = fixture();
        let now = clock.utc();
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: "a@b.co".to_string(),
            role: "user".to_string(),
            iss: "someone-else".to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(15)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_subject_mismatch_is_invalid() {
        let (clock, tokens) = fixture();
        let now = clock.utc();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4(),
            email: "a@b.co".to_string(),
            role: "admin".to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(15)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let (_, tokens) = fixture();
        assert!(matches!(tokens.validate("not.a.jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(tokens.validate(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        assert!(matches!(
            AccessTokens::new("", clock),
            Err(TokenError::Config(_))
        ));
    }
}
