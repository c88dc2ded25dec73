//! Inventory settlement
//!
//! A purchase is one unit of work: lock the ticket row, check and decrement
//! its remaining stock, record a confirmed payment, commit. Concurrent
//! purchases of the same ticket are serialized by the row lock in the order
//! they acquire it; different tickets never contend. Any failure (or the
//! caller dropping the future) drops the unit of work, which rolls back.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tickr_shared::settlement::SettlementEngine;
//! use tickr_shared::store::memory::InMemoryStore;
//! use uuid::Uuid;
//!
//! # async fn example(ticket_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let engine = SettlementEngine::new(store.clone(), store);
//!
//! let payment = engine.purchase(Uuid::new_v4(), ticket_id, 2).await?;
//! println!("paid {}", payment.paid_amount);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{NewPayment, Payment, PaymentStatus};
use crate::store::{PaymentRepository, SettlementStore, StoreError};

/// Error type for settlement
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Request is malformed (non-positive quantity, amount overflow)
    #[error("{0}")]
    Validation(String),

    /// Ticket or payment does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Not enough stock left; nothing was sold
    #[error("Insufficient tickets: requested {requested}, remaining {remaining}")]
    InsufficientInventory { requested: i32, remaining: i32 },

    /// Row lock could not be taken in time; safe to retry
    #[error("Ticket is busy, try again")]
    Unavailable,

    /// Store failure
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout => SettlementError::Unavailable,
            other => SettlementError::Store(other),
        }
    }
}

/// Runs purchases against a [`SettlementStore`]
#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn SettlementStore>,
    payments: Arc<dyn PaymentRepository>,
    lock_timeout: Option<Duration>,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn SettlementStore>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self {
            store,
            payments,
            lock_timeout: None,
        }
    }

    /// Bounds how long a purchase waits for the ticket row lock
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Buys `quantity` units of `ticket_id` for `buyer_id`
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity <= 0` or the amount overflows
    /// - `NotFound` if the ticket does not exist
    /// - `InsufficientInventory` if fewer than `quantity` units remain
    /// - `Unavailable` if the row lock wait exceeds the configured timeout
    /// - `Store` for any storage failure
    ///
    /// On every error the stock and the payment table are left untouched.
    pub async fn purchase(
        &self,
        buyer_id: Uuid,
        ticket_id: Uuid,
        quantity: i32,
    ) -> Result<Payment, SettlementError> {
        if quantity <= 0 {
            return Err(SettlementError::Validation(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;

        let locked = match self.lock_timeout {
            Some(limit) => tokio::time::timeout(limit, tx.lock_ticket(ticket_id))
                .await
                .map_err(|_| {
                    warn!(ticket_id = %ticket_id, "Timed out waiting for ticket lock");
                    SettlementError::Unavailable
                })??,
            None => tx.lock_ticket(ticket_id).await?,
        };

        let mut ticket = locked.ok_or(SettlementError::NotFound("Ticket"))?;

        if !ticket.can_fulfil(quantity) {
            debug!(
                ticket_id = %ticket_id,
                requested = quantity,
                remaining = ticket.remaining_quantity,
                "Insufficient inventory"
            );
            return Err(SettlementError::InsufficientInventory {
                requested: quantity,
                remaining: ticket.remaining_quantity,
            });
        }

        let paid_amount = ticket
            .price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| SettlementError::Validation("payment amount overflows".to_string()))?;

        ticket.remaining_quantity -= quantity;
        tx.save_ticket(&ticket).await?;

        let payment = tx
            .create_payment(NewPayment {
                user_id: buyer_id,
                ticket_id,
                quantity,
                paid_amount,
                status: PaymentStatus::Confirmed,
            })
            .await?;

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            ticket_id = %ticket_id,
            user_id = %buyer_id,
            quantity,
            remaining = ticket.remaining_quantity,
            sold = ticket.sold(),
            "Purchase settled"
        );

        Ok(payment)
    }

    /// Loads a payment by ID
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, SettlementError> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .ok_or(SettlementError::NotFound("Payment"))
    }
}
