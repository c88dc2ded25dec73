//! Authentication endpoints
//!
//! This module provides session endpoints:
//! - Login
//! - Token refresh (rotating)
//! - Logout
//! - Caller profile
//!
//! # Endpoints
//!
//! - `POST /auth/login` - Exchange email and password for a token pair
//! - `POST /auth/refresh` - Exchange a refresh token for a new pair
//! - `POST /auth/logout` - Revoke refresh tokens (authenticated)
//! - `GET /auth/profile` - Current user (authenticated)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tickr_shared::{
    auth::{middleware::AuthContext, password, tokens::TokenPair},
    models::User,
};
use uuid::Uuid;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: Uuid,

    /// Access and refresh tokens
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    /// Refresh token
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Logout request
///
/// With a `refresh_token` only that session ends; without a body every
/// refresh token of the caller is revoked.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Number of refresh tokens removed
    pub revoked: u64,
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": "uuid",
///   "access_token": "eyJ...",
///   "refresh_token": "9f86d0...",
///   "token_type": "Bearer",
///   "expires_in": 900
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let Some(user) = state.users.find_by_email(&req.email).await? else {
        password::verify_dummy_password(&req.password);
        tracing::debug!("Login rejected: unknown email");
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let tokens = state.tokens.issue_pair(&user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        tokens,
    }))
}

/// Token refresh endpoint
///
/// The presented refresh token is consumed; a new access token and a new
/// refresh token are returned. Presenting a consumed token fails.
///
/// # Endpoint
///
/// ```text
/// POST /auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "9f86d0..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown, consumed or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    req.validate()?;

    let tokens = state.tokens.refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// Logout endpoint
///
/// # Endpoint
///
/// ```text
/// POST /auth/logout
/// Authorization: Bearer <access_token>
/// ```
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<LogoutRequest>>,
) -> ApiResult<Json<LogoutResponse>> {
    let single = body.and_then(|Json(req)| req.refresh_token);

    let revoked = match single {
        Some(token) => state.tokens.revoke_one(&token).await?,
        None => state.tokens.revoke_all_for_user(auth.user_id).await?,
    };

    tracing::info!(user_id = %auth.user_id, revoked, "User logged out");
    Ok(Json(LogoutResponse { revoked }))
}

/// Caller profile
///
/// Reads the stored user so renamed accounts show current data even when the
/// access token predates the change.
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
