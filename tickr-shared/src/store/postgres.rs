//! PostgreSQL store
//!
//! Implements every repository trait on a single `PgPool`. Settlement units
//! of work wrap a `sqlx::Transaction` and lock ticket rows with
//! `SELECT ... FOR UPDATE`; dropping the transaction rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    EventRepository, PaymentRepository, RefreshTokenRepository, SettlementStore, SettlementTx,
    StoreError, StoreHealth, StoreResult, TicketRepository, UserRepository,
};
use crate::models::{
    CreateEvent, CreateTicket, CreateUser, Event, NewPayment, NewRefreshToken, Payment,
    RefreshToken, Ticket, User, UserPatch,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";
const TICKET_COLUMNS: &str =
    "id, event_id, price, total_quantity, remaining_quantity, created_at, updated_at";
const PAYMENT_COLUMNS: &str =
    "id, user_id, ticket_id, quantity, paid_amount, status, created_at, updated_at";
const EVENT_COLUMNS: &str =
    "id, organizer_id, title, venue, starts_at, ends_at, created_at, updated_at";
const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bounds how long a settlement waits for a ticket row lock.
    ///
    /// Applied per transaction with `SET LOCAL lock_timeout`; an elapsed wait
    /// surfaces as [`StoreError::LockTimeout`].
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, data: CreateUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
        if patch.is_empty() {
            return UserRepository::find_by_id(self, id).await;
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn create(&self, data: NewRefreshToken) -> StoreResult<RefreshToken> {
        let token = sqlx::query_as::<_, RefreshToken>(&format!(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {REFRESH_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.token_hash)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    async fn consume_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(&format!(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = $1 AND expires_at > $2
            RETURNING {REFRESH_COLUMNS}
            "#
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn create(&self, data: CreateEvent) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (organizer_id, title, venue, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(data.organizer_id)
        .bind(data.title)
        .bind(data.venue)
        .bind(data.starts_at)
        .bind(data.ends_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }
}

#[async_trait]
impl TicketRepository for PgStore {
    async fn create(&self, data: CreateTicket) -> StoreResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (event_id, price, total_quantity, remaining_quantity)
            VALUES ($1, $2, $3, $3)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(data.event_id)
        .bind(data.price)
        .bind(data.total_quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SettlementStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn SettlementTx>> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not accept bind parameters; the value is an integer we own.
            sqlx::query(&format!(
                "SET LOCAL lock_timeout = '{}ms'",
                timeout.as_millis().max(1)
            ))
            .execute(&mut *tx)
            .await?;
        }

        Ok(Box::new(PgSettlementTx { tx }))
    }
}

/// Settlement unit of work on a PostgreSQL transaction
pub struct PgSettlementTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SettlementTx for PgSettlementTx {
    async fn lock_ticket(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(ticket_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(ticket)
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET remaining_quantity = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.remaining_quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn create_payment(&mut self, data: NewPayment) -> StoreResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (user_id, ticket_id, quantity, paid_amount, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.ticket_id)
        .bind(data.quantity)
        .bind(data.paid_amount)
        .bind(data.status)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(payment)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
