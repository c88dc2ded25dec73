//! Payment endpoints
//!
//! - `POST /payments` - Buy tickets (settles atomically)
//! - `GET /payments/:id` - Read a payment (buyer or admin)

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
    models::{Payment, Role},
    settlement::SettlementError,
};
use uuid::Uuid;
use validator::Validate;

/// Purchase request
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    pub ticket_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    /// Buyer, when an admin purchases on someone's behalf. Defaults to the caller.
    pub user_id: Option<Uuid>,
}

/// Buy tickets
///
/// # Endpoint
///
/// ```text
/// POST /payments
/// Authorization: Bearer <access_token>
///
/// { "ticket_id": "uuid", "quantity": 3 }
/// ```
///
/// # Response
///
/// `201 Created` with the confirmed payment.
///
/// # Errors
///
/// - `400 Bad Request`: Bad quantity or not enough tickets left
/// - `403 Forbidden`: Buying for another user without admin role
/// - `404 Not Found`: No such ticket or buyer
/// - `503 Service Unavailable`: Ticket row stayed locked too long, retry
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let buyer_id = req.user_id.unwrap_or(auth.user_id);
    Policy::OwnerOrRole(Role::Admin).authorize(&auth, &Resource::Path(buyer_id))?;

    req.validate()?;

    if buyer_id != auth.user_id && state.users.find_by_id(buyer_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let payment = state
        .settlement
        .purchase(buyer_id, req.ticket_id, req.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// Read a payment
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the buyer and not admin
/// - `404 Not Found`: No such payment
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<Json<Payment>> {
    let payment = match state.settlement.get_payment(payment_id).await {
        Ok(payment) => Some(payment),
        Err(SettlementError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    Policy::EntityOwnerOrRole(Role::Admin)
        .authorize(&auth, &Resource::Entity(payment.as_ref().map(|p| p.user_id)))?;

    payment
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))
}
