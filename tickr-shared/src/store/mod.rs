//! Persistence interfaces for Tickr
//!
//! Every entity is reached through an `async_trait` repository so the token
//! service, the settlement engine and the HTTP layer never depend on a
//! concrete backend. Two backends are provided:
//!
//! - [`postgres::PgStore`]: production store on a `sqlx` pool
//! - [`memory::InMemoryStore`]: process-local store used by tests and demos
//!
//! # Settlement units of work
//!
//! [`SettlementStore::begin`] opens a [`SettlementTx`]. A unit of work holds
//! exclusive row locks on the tickets it has locked; its writes become
//! visible only after [`SettlementTx::commit`]. Dropping it without
//! committing rolls everything back and releases the locks.
//!
//! # Example
//!
//! ```no_run
//! use tickr_shared::store::{memory::InMemoryStore, SettlementStore, SettlementTx};
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let mut tx = store.begin().await?;
//! if let Some(mut ticket) = tx.lock_ticket(Uuid::new_v4()).await? {
//!     ticket.remaining_quantity -= 1;
//!     tx.save_ticket(&ticket).await?;
//! }
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CreateEvent, CreateTicket, CreateUser, Event, NewPayment, NewRefreshToken, Payment,
    RefreshToken, Ticket, User, UserPatch,
};

/// PostgreSQL `unique_violation`
const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL `foreign_key_violation`
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL `check_violation`
const PG_CHECK_VIOLATION: &str = "23514";

/// PostgreSQL `lock_not_available`, raised when `lock_timeout` elapses
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row expected to exist is missing
    #[error("Record not found")]
    NotFound,

    /// Unique, foreign key or check constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Waiting for a row lock took longer than allowed
    #[error("Timed out waiting for row lock")]
    LockTimeout,

    /// Backend-specific failure outside sqlx
    #[error("Store error: {0}")]
    Backend(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return StoreError::NotFound;
        }

        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                Some(PG_LOCK_NOT_AVAILABLE) => return StoreError::LockTimeout,
                Some(PG_UNIQUE_VIOLATION)
                | Some(PG_FOREIGN_KEY_VIOLATION)
                | Some(PG_CHECK_VIOLATION) => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                _ => {}
            }
        }

        StoreError::Database(err)
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Duplicate email (case-insensitive) is a `Conflict`.
    async fn create(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks a user up by email, ignoring case
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Applies a partial update. Returns `None` if the user does not exist.
    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>>;
}

/// Refresh token persistence
///
/// Tokens are addressed by their SHA-256 digest. All deletions are
/// idempotent and report how many rows went away.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, data: NewRefreshToken) -> StoreResult<RefreshToken>;

    /// Atomically removes and returns the token with `token_hash` if it is
    /// still active at `now`. Expired tokens are left for the purge.
    async fn consume_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshToken>>;

    async fn delete(&self, token_hash: &str) -> StoreResult<u64>;

    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Removes every token with `expires_at <= now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Event persistence
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, data: CreateEvent) -> StoreResult<Event>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;
}

/// Ticket stock persistence outside settlement
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Creates stock with `remaining_quantity = total_quantity`
    async fn create(&self, data: CreateTicket) -> StoreResult<Ticket>;

    /// Reads committed stock without locking
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>>;
}

/// Read-only payment access
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>>;
}

/// Liveness probe for the backing store
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

/// Opens settlement units of work
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn SettlementTx>>;
}

/// A settlement unit of work
///
/// Rolls back when dropped unless [`commit`](SettlementTx::commit) succeeded.
#[async_trait]
pub trait SettlementTx: Send {
    /// Takes the exclusive row lock on a ticket and returns its current
    /// state, or `None` if no such ticket exists. Waiters are served in
    /// arrival order.
    async fn lock_ticket(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>>;

    /// Stages the new stock counters of a ticket locked by this unit of work
    async fn save_ticket(&mut self, ticket: &Ticket) -> StoreResult<()>;

    /// Stages a payment row
    async fn create_payment(&mut self, data: NewPayment) -> StoreResult<Payment>;

    /// Persists every staged write and releases the locks
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
