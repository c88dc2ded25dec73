//! Bearer token authentication for Axum
//!
//! Extracts `Authorization: Bearer <token>`, validates the access token and
//! inserts an [`AuthContext`] into the request extensions. Every failure is a
//! 401; expired and otherwise invalid tokens are logged differently but
//! answered with the same message so clients cannot probe the reason.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Extension, Router};
//! use mockable::DefaultClock;
//! use tickr_shared::auth::jwt::AccessTokens;
//! use tickr_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
//!
//! async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
//!     format!("{} ({})", auth.email, auth.role)
//! }
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = AccessTokens::new("a-secret-key-of-at-least-32-bytes!!", Arc::new(DefaultClock))?;
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(tokens, jwt_auth_middleware));
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{AccessTokens, Claims, TokenError};

/// Authenticated caller, added to request extensions
///
/// Handlers read it with `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    /// Role string from the token; unknown values fail every role check
    pub role: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Error type for authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization header format")]
    InvalidFormat,

    /// Token failed validation
    #[error("Invalid or expired token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Pulls the bearer token out of the request headers
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidFormat),
    }
}

/// Validates the bearer token in `headers` and returns the caller
pub fn authenticate(tokens: &AccessTokens, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let token = extract_bearer(headers)?;

    match tokens.validate(token) {
        Ok(claims) => Ok(claims.into()),
        Err(TokenError::Expired) => {
            tracing::debug!("Rejected expired access token");
            Err(AuthError::InvalidToken)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected invalid access token");
            Err(AuthError::InvalidToken)
        }
    }
}

/// Axum middleware requiring a valid access token
pub async fn jwt_auth_middleware(
    State(tokens): State<AccessTokens>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate(&tokens, req.headers())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
