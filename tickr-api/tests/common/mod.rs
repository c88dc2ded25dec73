//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A router wired to the in-memory store and a controllable clock
//! - Seeded users with ready-made tokens
//! - Request helpers returning status and parsed JSON

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use mockable::Clock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tickr_api::app::{build_router, AppState};
use tickr_api::config::Config;
use tickr_shared::models::{CreateUser, Role, User};
use tickr_shared::store::memory::InMemoryStore;
use tickr_shared::store::UserRepository;
use tickr_shared::test_support::MutableClock;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-key-32-bytes!!";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<MutableClock>,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// A user inserted straight into the store, with a token pair
pub struct SeededUser {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl SeededUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Builds a context with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), "postgresql://unused/tickr".to_string()),
            ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config");

        let clock = Arc::new(MutableClock::new(Utc::now()));
        let clock_dyn: Arc<dyn Clock + Send + Sync> = clock.clone();
        let store = Arc::new(InMemoryStore::with_clock(clock_dyn.clone()));

        let state = AppState::with_store(store.clone(), config, clock_dyn).expect("valid state");
        let app = build_router(state.clone());

        Self {
            app,
            state,
            store,
            clock,
        }
    }

    /// Sends a request through the router
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET with a raw `Authorization` header value
    pub async fn get_with_authorization(&self, uri: &str, authorization: &str) -> StatusCode {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())
            .unwrap();

        self.app.clone().oneshot(request).await.unwrap().status()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// Signs up through the API and asserts success
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .post(
                "/users",
                None,
                json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Logs in through the API and asserts success
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .post(
                "/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body
    }

    /// Inserts a user with `role` and issues tokens without hashing a password
    pub async fn seed_user(&self, role: Role) -> SeededUser {
        let user = self
            .store
            .create(CreateUser {
                name: format!("{} user", role),
                email: format!("{}-{}@example.com", role, Uuid::new_v4()),
                password_hash: "not-a-real-hash".to_string(),
                role,
            })
            .await
            .unwrap();

        let pair = self.state.tokens.issue_pair(&user).await.unwrap();

        SeededUser {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }

    /// Creates an event owned by `organizer` through the API
    pub async fn create_event(&self, organizer: &SeededUser) -> Value {
        let starts_at = Utc::now() + Duration::days(30);
        let response = self
            .post(
                "/events",
                Some(&organizer.access_token),
                json!({
                    "title": "Concert",
                    "venue": "Arena",
                    "starts_at": starts_at,
                    "ends_at": starts_at + Duration::hours(3),
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Creates an event and `total` units of stock at `price`
    pub async fn create_ticket(&self, organizer: &SeededUser, price: i64, total: i32) -> Value {
        let event = self.create_event(organizer).await;
        let event_id = event["id"].as_str().unwrap();

        let response = self
            .post(
                &format!("/events/{}/tickets", event_id),
                Some(&organizer.access_token),
                json!({ "price": price, "total_quantity": total }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Buys through the API
    pub async fn purchase(&self, buyer: &SeededUser, ticket_id: &str, quantity: i32) -> TestResponse {
        self.post(
            "/payments",
            Some(&buyer.access_token),
            json!({ "ticket_id": ticket_id, "quantity": quantity }),
        )
        .await
    }
}
