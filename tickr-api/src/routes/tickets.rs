//! Ticket stock endpoints
//!
//! - `POST /events/:id/tickets` - Create stock (event organizer or admin)
//! - `GET /tickets/:id` - Read current stock (public)

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
    },
    models::{CreateTicket, Role, Ticket},
};
use uuid::Uuid;
use validator::Validate;

/// Create ticket request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    /// Unit price in minor currency units
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub total_quantity: i32,
}

/// Create ticket stock for an event
///
/// # Endpoint
///
/// ```text
/// POST /events/:id/tickets
/// Authorization: Bearer <access_token>
///
/// { "price": 2500, "total_quantity": 100 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller does not own the event and is not admin
/// - `404 Not Found`: No such event
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(event_id): Path<Uuid>,
    ApiJson(req): ApiJson<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let event = state.events.find_by_id(event_id).await?;
    Policy::EntityOwnerOrRole(Role::Admin)
        .authorize(&auth, &Resource::Entity(event.map(|e| e.organizer_id)))?;

    req.validate()?;

    let ticket = state
        .tickets
        .create(CreateTicket {
            event_id,
            price: req.price,
            total_quantity: req.total_quantity,
        })
        .await?;

    tracing::info!(
        ticket_id = %ticket.id,
        event_id = %event_id,
        total = ticket.total_quantity,
        "Ticket stock created"
    );
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Read ticket stock
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .find_by_id(ticket_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    Ok(Json(ticket))
}
