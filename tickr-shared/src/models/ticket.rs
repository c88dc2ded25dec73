//! Ticket stock model
//!
//! A ticket row is the inventory ledger entry for one kind of ticket on an
//! event. `remaining_quantity` only ever changes inside a settlement unit of
//! work and always satisfies `0 <= remaining_quantity <= total_quantity`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket stock record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    /// Unique ticket ID
    pub id: Uuid,

    /// Event this stock belongs to
    pub event_id: Uuid,

    /// Unit price in minor currency units
    pub price: i64,

    /// Stock issued at creation
    pub total_quantity: i32,

    /// Stock still available for sale
    pub remaining_quantity: i32,

    /// When the ticket was created
    pub created_at: DateTime<Utc>,

    /// When the ticket was last updated
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether `quantity` units can be taken from the remaining stock
    pub fn can_fulfil(&self, quantity: i32) -> bool {
        quantity > 0 && self.remaining_quantity >= quantity
    }

    /// Number of units already sold
    pub fn sold(&self) -> i32 {
        self.total_quantity - self.remaining_quantity
    }
}

/// Input for creating ticket stock
///
/// `remaining_quantity` starts equal to `total_quantity`.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub event_id: Uuid,
    pub price: i64,
    pub total_quantity: i32,
}
