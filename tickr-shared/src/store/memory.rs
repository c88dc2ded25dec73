//! In-memory store
//!
//! Keeps every table in an `Arc<RwLock<HashMap>>`. Ticket rows additionally
//! own a FIFO `tokio::sync::Mutex` that plays the role of the PostgreSQL row
//! lock, so settlement behaves the same way against both backends: a unit of
//! work holds the row guard until it commits or is dropped, and staged writes
//! are only applied on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    EventRepository, PaymentRepository, RefreshTokenRepository, SettlementStore, SettlementTx,
    StoreError, StoreHealth, StoreResult, TicketRepository, UserRepository,
};
use crate::models::{
    CreateEvent, CreateTicket, CreateUser, Event, NewPayment, NewRefreshToken, Payment,
    RefreshToken, Ticket, User, UserPatch,
};

/// Process-local store
#[derive(Clone)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
    events: Arc<RwLock<HashMap<Uuid, Event>>>,
    tickets: Arc<RwLock<HashMap<Uuid, Ticket>>>,
    ticket_locks: Arc<RwLock<HashMap<Uuid, Arc<Mutex<()>>>>>,
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates a store that stamps rows with `clock`
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            refresh_tokens: Arc::new(RwLock::new(HashMap::new())),
            events: Arc::new(RwLock::new(HashMap::new())),
            tickets: Arc::new(RwLock::new(HashMap::new())),
            ticket_locks: Arc::new(RwLock::new(HashMap::new())),
            payments: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Committed payments for a ticket
    pub async fn payments_for_ticket(&self, ticket_id: Uuid) -> Vec<Payment> {
        self.payments
            .read()
            .await
            .values()
            .filter(|p| p.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    /// Number of stored refresh tokens
    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, data: CreateUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if email_taken(&users, &data.email, None) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }

        let now = self.now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        if let Some(email) = patch.email.as_deref() {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::Conflict("email already registered".to_string()));
            }
        }

        let now = self.now();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if !patch.is_empty() {
            patch.apply_to(user);
            user.updated_at = now;
        }

        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn create(&self, data: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&data.token_hash) {
            return Err(StoreError::Conflict("refresh token already exists".to_string()));
        }

        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            token_hash: data.token_hash,
            expires_at: data.expires_at,
            created_at: self.now(),
        };
        tokens.insert(token.token_hash.clone(), token.clone());

        Ok(token)
    }

    async fn consume_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshToken>> {
        let mut tokens = self.refresh_tokens.write().await;
        let active = tokens
            .get(token_hash)
            .is_some_and(|token| token.is_active(now));

        if active {
            Ok(tokens.remove(token_hash))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<u64> {
        let removed = self.refresh_tokens.write().await.remove(token_hash);
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.is_active(now));
        Ok((before - tokens.len()) as u64)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, data: CreateEvent) -> StoreResult<Event> {
        let now = self.now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: data.organizer_id,
            title: data.title,
            venue: data.venue,
            starts_at: data.starts_at,
            ends_at: data.ends_at,
            created_at: now,
            updated_at: now,
        };
        self.events.write().await.insert(event.id, event.clone());

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn create(&self, data: CreateTicket) -> StoreResult<Ticket> {
        if !self.events.read().await.contains_key(&data.event_id) {
            return Err(StoreError::Conflict(format!(
                "event {} does not exist",
                data.event_id
            )));
        }
        if data.total_quantity < 0 || data.price < 0 {
            return Err(StoreError::Conflict(
                "ticket price and quantity must not be negative".to_string(),
            ));
        }

        let now = self.now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            event_id: data.event_id,
            price: data.price,
            total_quantity: data.total_quantity,
            remaining_quantity: data.total_quantity,
            created_at: now,
            updated_at: now,
        };

        self.ticket_locks
            .write()
            .await
            .insert(ticket.id, Arc::new(Mutex::new(())));
        self.tickets.write().await.insert(ticket.id, ticket.clone());

        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn SettlementTx>> {
        Ok(Box::new(MemorySettlementTx {
            store: self.clone(),
            guards: HashMap::new(),
            staged_tickets: HashMap::new(),
            staged_payments: Vec::new(),
        }))
    }
}

/// In-memory unit of work
///
/// Holds owned row guards and staged writes. Dropping it discards the
/// staged writes and releases the guards.
struct MemorySettlementTx {
    store: InMemoryStore,
    guards: HashMap<Uuid, OwnedMutexGuard<()>>,
    staged_tickets: HashMap<Uuid, Ticket>,
    staged_payments: Vec<Payment>,
}

#[async_trait]
impl SettlementTx for MemorySettlementTx {
    async fn lock_ticket(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        if !self.guards.contains_key(&ticket_id) {
            let row_lock = match self.store.ticket_locks.read().await.get(&ticket_id) {
                Some(lock) => Arc::clone(lock),
                None => return Ok(None),
            };
            let guard = row_lock.lock_owned().await;
            self.guards.insert(ticket_id, guard);
        }

        if let Some(staged) = self.staged_tickets.get(&ticket_id) {
            return Ok(Some(staged.clone()));
        }

        Ok(self.store.tickets.read().await.get(&ticket_id).cloned())
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        if !self.guards.contains_key(&ticket.id) {
            return Err(StoreError::Backend(format!(
                "ticket {} saved without holding its row lock",
                ticket.id
            )));
        }
        if ticket.remaining_quantity < 0 || ticket.remaining_quantity > ticket.total_quantity {
            return Err(StoreError::Conflict(format!(
                "remaining quantity {} outside 0..={}",
                ticket.remaining_quantity, ticket.total_quantity
            )));
        }

        let mut staged = ticket.clone();
        staged.updated_at = self.store.now();
        self.staged_tickets.insert(ticket.id, staged);

        Ok(())
    }

    async fn create_payment(&mut self, data: NewPayment) -> StoreResult<Payment> {
        if data.quantity <= 0 {
            return Err(StoreError::Conflict(
                "payment quantity must be positive".to_string(),
            ));
        }

        let now = self.store.now();
        let payment = Payment {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            ticket_id: data.ticket_id,
            quantity: data.quantity,
            paid_amount: data.paid_amount,
            status: data.status,
            created_at: now,
            updated_at: now,
        };
        self.staged_payments.push(payment.clone());

        Ok(payment)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemorySettlementTx {
            store,
            guards,
            staged_tickets,
            staged_payments,
        } = *self;

        {
            let mut tickets = store.tickets.write().await;
            let mut payments = store.payments.write().await;

            for (id, ticket) in staged_tickets {
                tickets.insert(id, ticket);
            }
            for payment in staged_payments {
                payments.insert(payment.id, payment);
            }
        }

        drop(guards);
        Ok(())
    }
}
