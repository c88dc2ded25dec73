//! Error handling for the API server
//!
//! This module provides a unified error type that maps to HTTP responses.
//! All handlers return `Result<T, ApiError>`; the error enums of the shared
//! crate convert into it with `?`.
//!
//! # Example
//!
//! ```
//! use tickr_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::json;
//!
//! async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
//!     if !found {
//!         return Err(ApiError::NotFound("Ticket not found".to_string()));
//!     }
//!     Ok(Json(json!({ "ok": true })))
//! }
//! ```

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tickr_shared::auth::authorization::AuthzError;
use tickr_shared::auth::jwt::TokenError;
use tickr_shared::auth::middleware::AuthError;
use tickr_shared::auth::password::PasswordError;
use tickr_shared::settlement::SettlementError;
use tickr_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Validation errors (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Not enough ticket stock for the purchase (400)
    InsufficientInventory { requested: i32, remaining: i32 },

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503), retry after the given number of seconds
    ServiceUnavailable { retry_after: u64, message: String },
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Validation failure on a single field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::ValidationError(_)
            | ApiError::InsufficientInventory { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InsufficientInventory {
                requested,
                remaining,
            } => write!(
                f,
                "Insufficient inventory: requested {}, remaining {}",
                requested, remaining
            ),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable { message, .. } => {
                write!(f, "Service unavailable: {}", message)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Retry-After must be added after the body is built
        let retry_after = match &self {
            ApiError::ServiceUnavailable { retry_after, .. } => Some(*retry_after),
            _ => None,
        };

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            err @ ApiError::InsufficientInventory { .. } => {
                ("insufficient_inventory", err.to_string(), None)
            }
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable { message, .. } => {
                ("service_unavailable", message, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::LockTimeout => ApiError::ServiceUnavailable {
                retry_after: 1,
                message: "Resource is busy, try again".to_string(),
            },
            StoreError::Backend(_) | StoreError::Database(_) => {
                ApiError::InternalError(format!("Store error: {}", err))
            }
        }
    }
}

/// Convert settlement errors to API errors
impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::Validation(msg) => ApiError::BadRequest(msg),
            SettlementError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            SettlementError::InsufficientInventory {
                requested,
                remaining,
            } => ApiError::InsufficientInventory {
                requested,
                remaining,
            },
            SettlementError::Unavailable => ApiError::ServiceUnavailable {
                retry_after: 1,
                message: "Ticket is busy, try again".to_string(),
            },
            SettlementError::Store(err) => err.into(),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden => ApiError::Forbidden("Insufficient permissions".to_string()),
            AuthzError::ResourceNotFound => {
                ApiError::NotFound("Resource not found".to_string())
            }
        }
    }
}

/// Convert token errors to API errors
///
/// Expired and invalid tokens get the same answer.
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid(_) => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            TokenError::Config(msg) => ApiError::InternalError(format!("Token config: {}", msg)),
            TokenError::Store(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => ApiError::invalid_field("password", err.to_string()),
            _ => ApiError::InternalError(format!("Password operation failed: {}", err)),
        }
    }
}

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Convert JSON body rejections to API errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let text = err.body_text();
                let detail = text.strip_prefix(JSON_DATA_PREFIX).unwrap_or(&text);

                // serde_path_to_error prefixes the offending field path
                match detail.split_once(": ") {
                    Some((field, message))
                        if !field.is_empty() && !field.contains(char::is_whitespace) =>
                    {
                        ApiError::invalid_field(field, message)
                    }
                    _ => ApiError::invalid_field("body", detail),
                }
            }
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::BadRequest("Request body is not valid JSON".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => ApiError::BadRequest(
                "Expected request with `Content-Type: application/json`".to_string(),
            ),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

/// Convert `validator` derive errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_settlement_error_statuses() {
        let cases = [
            (
                SettlementError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (SettlementError::NotFound("Ticket"), StatusCode::NOT_FOUND),
            (
                SettlementError::InsufficientInventory {
                    requested: 3,
                    remaining: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                SettlementError::Unavailable,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SettlementError::Store(StoreError::Backend("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_authz_and_token_errors() {
        assert_eq!(
            ApiError::from(AuthzError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthzError::ResourceNotFound).status(),
            StatusCode::NOT_FOUND
        );

        let expired = ApiError::from(TokenError::Expired);
        let invalid = ApiError::from(TokenError::Invalid("bad signature".to_string()));
        assert_eq!(expired.to_string(), invalid.to_string());
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(
            ApiError::from(TokenError::Config("empty".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_password_policy_is_a_validation_error() {
        let err = ApiError::from(PasswordError::TooShort);
        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "password"));
    }

    #[tokio::test]
    async fn test_unavailable_sets_retry_after() {
        let response = ApiError::from(SettlementError::Unavailable).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        let body = body_json(response).await;
        assert_eq!(body["error"], "service_unavailable");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        let body = body_json(response).await;

        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_insufficient_inventory_body() {
        let response = ApiError::InsufficientInventory {
            requested: 3,
            remaining: 2,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "insufficient_inventory");
        assert_eq!(
            body["message"],
            "Insufficient inventory: requested 3, remaining 2"
        );
    }
}
