//! # Tickr API Server Library
//!
//! HTTP surface of Tickr: authentication, ticket stock and atomic purchases.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON body extractor with API error rejections
//! - `housekeeping`: Background refresh token purge
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod housekeeping;
pub mod routes;
