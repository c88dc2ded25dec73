//! Domain models for Tickr
//!
//! Plain data types shared by the stores, the settlement engine, and the
//! HTTP layer. Persistence lives in [`crate::store`].
//!
//! # Models
//!
//! - `user`: User accounts and the role hierarchy
//! - `event`: Events owned by organizers
//! - `ticket`: Ticket stock (the inventory ledger)
//! - `payment`: Payments recorded by settlement
//! - `refresh_token`: Persisted refresh token digests

pub mod event;
pub mod payment;
pub mod refresh_token;
pub mod ticket;
pub mod user;

pub use event::{CreateEvent, Event};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use refresh_token::{NewRefreshToken, RefreshToken};
pub use ticket::{CreateTicket, Ticket};
pub use user::{CreateUser, Role, User, UserPatch};
