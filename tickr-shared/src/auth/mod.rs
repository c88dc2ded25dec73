//! Authentication and authorization for Tickr
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing
//! - [`jwt`]: HS256 access tokens (15 minutes)
//! - [`refresh`]: Opaque refresh tokens (7 days) and their digests
//! - [`tokens`]: Token service tying access and refresh tokens to storage
//! - [`authorization`]: Role hierarchy and ownership policies
//! - [`middleware`]: Bearer token extraction for Axum
//!
//! # Example
//!
//! ```no_run
//! use tickr_shared::auth::password::{hash_password, verify_password};
//! use tickr_shared::auth::authorization::has_role;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("user_password")?;
//! assert!(verify_password("user_password", &hash)?);
//! assert!(has_role("admin", "organizer"));
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod tokens;
