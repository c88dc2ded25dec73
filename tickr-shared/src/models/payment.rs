//! Payment model
//!
//! A payment is written exactly once per successful settlement. The paid
//! amount is captured from the ticket price at lock time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

/// Payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    /// Unique payment ID
    pub id: Uuid,

    /// Buyer
    pub user_id: Uuid,

    /// Ticket purchased
    pub ticket_id: Uuid,

    /// Units purchased (always > 0)
    pub quantity: i32,

    /// `quantity * price` in minor currency units
    pub paid_amount: i64,

    /// Payment status
    pub status: PaymentStatus,

    /// When the payment was recorded
    pub created_at: DateTime<Utc>,

    /// When the payment was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a payment inside a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub paid_amount: i64,
    pub status: PaymentStatus,
}
