//! Application state and router builder
//!
//! This module defines the shared application state and provides
//! a function to build the Axum router with all routes and middleware.
//!
//! # Example
//!
//! ```no_run
//! use tickr_api::{app::AppState, config::Config};
//! use sqlx::PgPool;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let state = AppState::postgres(pool, config)?;
//! let app = tickr_api::app::build_router(state);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::routes;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use mockable::{Clock, DefaultClock};
use sqlx::PgPool;
use std::sync::Arc;
use tickr_shared::{
    auth::{jwt::AccessTokens, jwt::TokenError, middleware::jwt_auth_middleware, tokens::TokenService},
    settlement::SettlementEngine,
    store::{
        memory::InMemoryStore, postgres::PgStore, EventRepository, PaymentRepository,
        RefreshTokenRepository, SettlementStore, StoreHealth, TicketRepository, UserRepository,
    },
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub health: Arc<dyn StoreHealth>,

    /// Access and refresh token lifecycle
    pub tokens: TokenService,

    /// Atomic ticket purchase
    pub settlement: SettlementEngine,
}

impl AppState {
    /// Wires every repository and service to one store
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Config` if the JWT secret is empty.
    pub fn with_store<S>(
        store: Arc<S>,
        config: Config,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, TokenError>
    where
        S: UserRepository
            + RefreshTokenRepository
            + EventRepository
            + TicketRepository
            + PaymentRepository
            + StoreHealth
            + SettlementStore
            + 'static,
    {
        let access = AccessTokens::new(&config.jwt.secret, clock.clone())?;
        let tokens = TokenService::new(access, store.clone(), store.clone(), clock);
        let settlement = SettlementEngine::new(store.clone(), store.clone())
            .with_lock_timeout(config.settlement.lock_timeout());

        Ok(Self {
            config: Arc::new(config),
            users: store.clone(),
            events: store.clone(),
            tickets: store.clone(),
            health: store,
            tokens,
            settlement,
        })
    }

    /// Production state on PostgreSQL
    ///
    /// The lock timeout is applied both as `SET LOCAL lock_timeout` and as
    /// a client-side bound in the settlement engine.
    pub fn postgres(pool: PgPool, config: Config) -> Result<Self, TokenError> {
        let store = PgStore::new(pool).with_lock_timeout(config.settlement.lock_timeout());
        Self::with_store(Arc::new(store), config, Arc::new(DefaultClock))
    }

    /// Process-local state, for tests and demos
    pub fn in_memory(config: Config) -> Result<Self, TokenError> {
        Self::with_store(Arc::new(InMemoryStore::new()), config, Arc::new(DefaultClock))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                 # Health check (public)
/// ├── POST /users                  # Sign up (public)
/// ├── PUT  /users/:id              # Update user (owner or admin)
/// ├── /auth/
/// │   ├── POST /login              # public
/// │   ├── POST /refresh            # public, refresh token in body
/// │   ├── POST /logout             # authenticated
/// │   └── GET  /profile            # authenticated
/// ├── POST /events                 # organizer or admin
/// ├── POST /events/:id/tickets     # event organizer or admin
/// ├── GET  /tickets/:id            # public
/// ├── POST /payments               # authenticated
/// └── GET  /payments/:id           # buyer or admin
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Bearer authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::create_user))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/tickets/:id", get(routes::tickets::get_ticket));

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/profile", get(routes::auth::profile))
        .route("/users/:id", put(routes::users::update_user))
        .route("/events", post(routes::events::create_event))
        .route("/events/:id/tickets", post(routes::tickets::create_ticket))
        .route("/payments", post(routes::payments::create_payment))
        .route("/payments/:id", get(routes::payments::get_payment))
        .route_layer(axum::middleware::from_fn_with_state(
            state.tokens.access_tokens().clone(),
            jwt_auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
