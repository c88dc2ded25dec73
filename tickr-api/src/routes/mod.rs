//! API route handlers
//!
//! This module contains all route handlers organized by resource:
//!
//! - `health`: Health check endpoint
//! - `auth`: Login, refresh, logout, profile
//! - `users`: Signup and user updates
//! - `events`: Event creation
//! - `tickets`: Ticket stock
//! - `payments`: Purchases and payment lookup

pub mod auth;
pub mod events;
pub mod health;
pub mod payments;
pub mod tickets;
pub mod users;
