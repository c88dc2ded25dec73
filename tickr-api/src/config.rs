//! Configuration management for the API server
//!
//! This module loads configuration from environment variables and provides
//! a type-safe configuration struct.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 8080)
//! - `APP_ENV`: `production` enables the strict checks below
//! - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
//! - `JWT_SECRET`: Secret key for access token signing
//! - `SETTLEMENT_LOCK_TIMEOUT_MS`: Max wait for a ticket row lock, `0` waits
//!   forever (default: 5000)
//! - `REFRESH_PURGE_INTERVAL_SECS`: Expired refresh token sweep interval
//!   (default: 3600)
//! - `RUST_LOG`: Log level (default: debug for Tickr crates)
//! - `LOG_FORMAT`: `json` for structured log output
//!
//! Outside production a missing `JWT_SECRET` falls back to a development key
//! with a loud warning. In production it is required and must be at least 32
//! characters.
//!
//! # Example
//!
//! ```no_run
//! use tickr_api::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}:{}", config.api.host, config.api.port);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Signing key used when `JWT_SECRET` is unset outside production
pub const DEV_JWT_SECRET: &str = "default-secret-key-change-in-production";

/// Minimum `JWT_SECRET` length accepted in production
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Purchase settlement configuration
    pub settlement: SettlementConfig,

    /// Background housekeeping configuration
    pub housekeeping: HousekeepingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Running with `APP_ENV=production`
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Purchase settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Max wait for a ticket row lock in milliseconds, `None` waits forever
    pub lock_timeout_ms: Option<u64>,
}

impl SettlementConfig {
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}

/// Background housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// Seconds between expired refresh token sweeps
    pub refresh_purge_interval_secs: u64,
}

impl HousekeepingConfig {
    pub fn refresh_purge_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_purge_interval_secs)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - `APP_ENV=production` and `JWT_SECRET` is missing or too short
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    ///
    /// `var` returns the value of a variable, or `None` when unset.
    ///
    /// # Example
    ///
    /// ```
    /// use tickr_api::config::Config;
    ///
    /// let config = Config::from_lookup(|key| match key {
    ///     "DATABASE_URL" => Some("postgresql://localhost/tickr".to_string()),
    ///     "API_PORT" => Some("9000".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.bind_address(), "0.0.0.0:9000");
    /// ```
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = Self::jwt_secret(var("JWT_SECRET"), production)?;

        let lock_timeout_ms = match var("SETTLEMENT_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()?
        {
            0 => None,
            ms => Some(ms),
        };

        let refresh_purge_interval_secs = var("REFRESH_PURGE_INTERVAL_SECS")
            .unwrap_or_else(|| "3600".to_string())
            .parse::<u64>()?;

        if refresh_purge_interval_secs == 0 {
            anyhow::bail!("REFRESH_PURGE_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            settlement: SettlementConfig { lock_timeout_ms },
            housekeeping: HousekeepingConfig {
                refresh_purge_interval_secs,
            },
        })
    }

    fn jwt_secret(value: Option<String>, production: bool) -> anyhow::Result<String> {
        let secret = match value.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => {
                anyhow::bail!("JWT_SECRET environment variable is required in production")
            }
            None => {
                tracing::warn!(
                    "JWT_SECRET is not set, using the built-in development key. \
                     This is NOT safe for production"
                );
                return Ok(DEV_JWT_SECRET.to_string());
            }
        };

        if secret.len() < MIN_JWT_SECRET_LENGTH {
            if production {
                anyhow::bail!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_JWT_SECRET_LENGTH
                );
            }
            tracing::warn!(
                length = secret.len(),
                "JWT_SECRET is shorter than {} characters",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Ok(secret)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
