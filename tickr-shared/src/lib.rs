//! # Tickr Shared Library
//!
//! Domain types and business logic behind the Tickr API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, events, tickets, payments, refresh tokens
//! - `auth`: Passwords, access/refresh tokens, authorization policy, middleware
//! - `store`: Repository traits with PostgreSQL and in-memory backends
//! - `settlement`: Atomic ticket purchase
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod settlement;
pub mod store;
pub mod test_support;

/// Current version of the Tickr shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
