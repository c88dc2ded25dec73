//! Database layer for Tickr
//!
//! # Modules
//!
//! - `pool`: PostgreSQL connection pool with health checks
//! - `migrations`: Embedded migration runner
//!
//! Queries live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
