//! User endpoints
//!
//! - `POST /users` - Sign up (public, always role `user`)
//! - `PUT /users/:id` - Update a user (owner or admin; role changes admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tickr_shared::{
    auth::{
        authorization::{Policy, Resource},
        middleware::AuthContext,
        password,
    },
    models::{CreateUser, Role, User, UserPatch},
    store::StoreError,
};
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (checked against the password policy)
    pub password: String,
}

/// Partial user update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    /// Only admins may change roles
    pub role: Option<Role>,
}

/// Maps a duplicate email to a friendlier conflict
fn email_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::Conflict("Email already registered".to_string()),
        other => other.into(),
    }
}

/// Sign up
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// {
///   "name": "Jane Doe",
///   "email": "jane@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists (case-insensitive)
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;
    password::check_password_policy(&req.password)?;

    let password_hash = password::hash_password(&req.password)?;

    let user = state
        .users
        .create(CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(email_conflict)?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user
///
/// # Endpoint
///
/// ```text
/// PUT /users/:id
/// Authorization: Bearer <access_token>
///
/// { "name": "New Name" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Not the owner and not admin, or a non-admin role change
/// - `404 Not Found`: No such user
/// - `409 Conflict`: Email taken
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    Policy::OwnerOrRole(Role::Admin).authorize(&auth, &Resource::Path(user_id))?;
    if req.role.is_some() {
        Policy::Role(Role::Admin).authorize(&auth, &Resource::None)?;
    }

    req.validate()?;

    let password_hash = match req.password.as_deref() {
        Some(plain) => {
            password::check_password_policy(plain)?;
            Some(password::hash_password(plain)?)
        }
        None => None,
    };

    let patch = UserPatch {
        name: req.name,
        email: req.email,
        password_hash,
        role: req.role,
    };

    let user = state
        .users
        .update(user_id, patch)
        .await
        .map_err(email_conflict)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, actor_id = %auth.user_id, "User updated");
    Ok(Json(user))
}
