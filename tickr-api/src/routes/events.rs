//! Event endpoints
//!
//! - `POST /events` - Create an event owned by the caller (organizer or admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tickr_shared::{
    auth::{
        authorization::{Policy, Resource},
        middleware::AuthContext,
    },
    models::{CreateEvent, Event, Role},
};
use validator::Validate;

/// Create event request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 200, message = "Venue must be 1-200 characters"))]
    pub venue: String,

    pub starts_at: DateTime<Utc>,

    pub ends_at: DateTime<Utc>,
}

/// Create an event
///
/// # Endpoint
///
/// ```text
/// POST /events
/// Authorization: Bearer <access_token>
///
/// {
///   "title": "RustConf",
///   "venue": "Main Hall",
///   "starts_at": "2026-09-01T18:00:00Z",
///   "ends_at": "2026-09-01T22:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or `ends_at` not after `starts_at`
/// - `403 Forbidden`: Caller is neither organizer nor admin
pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    Policy::AnyRole(vec![Role::Organizer, Role::Admin]).authorize(&auth, &Resource::None)?;

    req.validate()?;
    if req.ends_at <= req.starts_at {
        return Err(ApiError::invalid_field(
            "ends_at",
            "Event must end after it starts",
        ));
    }

    let event = state
        .events
        .create(CreateEvent {
            organizer_id: auth.user_id,
            title: req.title,
            venue: req.venue,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        })
        .await?;

    tracing::info!(event_id = %event.id, organizer_id = %auth.user_id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}
