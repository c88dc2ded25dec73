//! Purchase flow through the HTTP layer
//!
//! - End-to-end purchase against limited stock
//! - Payment visibility (buyer, admin, others)
//! - Concurrent buyers never oversell
//! - Lock waits that exceed the timeout answer 503
//! - Malformed purchase bodies answer 400

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::TestContext;
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use tickr_shared::models::Role;
use tickr_shared::store::SettlementStore;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_end_to_end_purchase() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let ticket = ctx.create_ticket(&organizer, 4200, 5).await;
    let ticket_id = ticket["id"].as_str().unwrap();

    ctx.signup("Buyer", "buyer@example.com", "buyer-password").await;
    let session = ctx.login("buyer@example.com", "buyer-password").await;
    let token = session["access_token"].as_str().unwrap();

    let first = ctx
        .post(
            "/payments",
            Some(token),
            json!({ "ticket_id": ticket_id, "quantity": 3 }),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(first.body["status"], "confirmed");
    assert_eq!(first.body["quantity"], 3);
    assert_eq!(first.body["paid_amount"], 3 * 4200);
    assert_eq!(first.body["user_id"], session["user_id"]);

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 2);

    let second = ctx
        .post(
            "/payments",
            Some(token),
            json!({ "ticket_id": ticket_id, "quantity": 3 }),
        )
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["error"], "insufficient_inventory");

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 2);

    let payment_id = first.body["id"].as_str().unwrap();
    let fetched = ctx
        .get(&format!("/payments/{}", payment_id), Some(token))
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, first.body);
}

#[tokio::test]
async fn test_purchase_requires_authentication() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/payments",
            None,
            json!({ "ticket_id": Uuid::new_v4(), "quantity": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_purchase_rejects_bad_quantity_and_unknown_ticket() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let buyer = ctx.seed_user(Role::User).await;
    let ticket = ctx.create_ticket(&organizer, 1000, 5).await;
    let ticket_id = ticket["id"].as_str().unwrap();

    for quantity in [0, -2] {
        let response = ctx.purchase(&buyer, ticket_id, quantity).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["details"][0]["field"], "quantity");
    }

    let unknown = ctx
        .purchase(&buyer, &Uuid::new_v4().to_string(), 1)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "Ticket not found");

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 5);
}

#[tokio::test]
async fn test_purchase_rejects_malformed_body() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let buyer = ctx.seed_user(Role::User).await;
    let ticket = ctx.create_ticket(&organizer, 1000, 5).await;
    let ticket_id = ticket["id"].as_str().unwrap();

    for quantity in [json!("3"), json!(4_294_967_296_i64), json!(1.5)] {
        let response = ctx
            .post(
                "/payments",
                Some(&buyer.access_token),
                json!({ "ticket_id": ticket_id, "quantity": quantity }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
        assert_eq!(response.body["error"], "validation_error");
        assert_eq!(response.body["details"][0]["field"], "quantity");
    }

    let missing = ctx
        .post(
            "/payments",
            Some(&buyer.access_token),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "validation_error");

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 5);
}

#[tokio::test]
async fn test_purchase_rejects_unparseable_json() {
    let ctx = TestContext::new();
    let buyer = ctx.seed_user(Role::User).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/payments")
        .header(header::AUTHORIZATION, format!("Bearer {}", buyer.access_token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"ticket_id\": "))
        .unwrap();
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_payment_visible_to_buyer_and_admin_only() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let buyer = ctx.seed_user(Role::User).await;
    let stranger = ctx.seed_user(Role::User).await;
    let admin = ctx.seed_user(Role::Admin).await;

    let ticket = ctx.create_ticket(&organizer, 500, 3).await;
    let payment = ctx
        .purchase(&buyer, ticket["id"].as_str().unwrap(), 1)
        .await;
    let uri = format!("/payments/{}", payment.body["id"].as_str().unwrap());

    assert_eq!(
        ctx.get(&uri, Some(&buyer.access_token)).await.status,
        StatusCode::OK
    );
    assert_eq!(
        ctx.get(&uri, Some(&admin.access_token)).await.status,
        StatusCode::OK
    );
    assert_eq!(
        ctx.get(&uri, Some(&stranger.access_token)).await.status,
        StatusCode::FORBIDDEN
    );
    // Organizers sell tickets but do not see buyers' payments
    assert_eq!(
        ctx.get(&uri, Some(&organizer.access_token)).await.status,
        StatusCode::FORBIDDEN
    );

    let missing = ctx
        .get(
            &format!("/payments/{}", Uuid::new_v4()),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_buying_on_behalf_requires_admin() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let buyer = ctx.seed_user(Role::User).await;
    let other = ctx.seed_user(Role::User).await;
    let admin = ctx.seed_user(Role::Admin).await;
    let ticket = ctx.create_ticket(&organizer, 800, 4).await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let denied = ctx
        .post(
            "/payments",
            Some(&other.access_token),
            json!({ "ticket_id": ticket_id, "quantity": 1, "user_id": buyer.id() }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let explicit_self = ctx
        .post(
            "/payments",
            Some(&buyer.access_token),
            json!({ "ticket_id": ticket_id, "quantity": 1, "user_id": buyer.id() }),
        )
        .await;
    assert_eq!(explicit_self.status, StatusCode::CREATED);

    let on_behalf = ctx
        .post(
            "/payments",
            Some(&admin.access_token),
            json!({ "ticket_id": ticket_id, "quantity": 2, "user_id": buyer.id() }),
        )
        .await;
    assert_eq!(on_behalf.status, StatusCode::CREATED);
    assert_eq!(on_behalf.body["user_id"], buyer.id().to_string());

    let ghost = ctx
        .post(
            "/payments",
            Some(&admin.access_token),
            json!({ "ticket_id": ticket_id, "quantity": 1, "user_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let ctx = TestContext::new();
    let organizer = ctx.seed_user(Role::Organizer).await;
    let ticket = ctx.create_ticket(&organizer, 1500, 4).await;
    let ticket_id = ticket["id"].as_str().unwrap().to_string();

    let mut buyers = Vec::new();
    for _ in 0..10 {
        buyers.push(ctx.seed_user(Role::User).await);
    }

    let ctx = std::sync::Arc::new(ctx);
    let attempts = buyers.into_iter().map(|buyer| {
        let ctx = ctx.clone();
        let ticket_id = ticket_id.clone();
        tokio::spawn(async move { ctx.purchase(&buyer, &ticket_id, 1).await.status })
    });
    let statuses: Vec<StatusCode> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        4
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        6
    );

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 0);

    let ticket_uuid: Uuid = ticket_id.parse().unwrap();
    let payments = ctx.store.payments_for_ticket(ticket_uuid).await;
    assert_eq!(payments.len(), 4);
    assert_eq!(payments.iter().map(|p| p.quantity).sum::<i32>(), 4);
}

#[tokio::test]
async fn test_lock_wait_timeout_answers_service_unavailable() {
    let ctx = TestContext::with_vars(&[("SETTLEMENT_LOCK_TIMEOUT_MS", "50")]);
    let organizer = ctx.seed_user(Role::Organizer).await;
    let buyer = ctx.seed_user(Role::User).await;
    let ticket = ctx.create_ticket(&organizer, 700, 2).await;
    let ticket_id = ticket["id"].as_str().unwrap();
    let ticket_uuid: Uuid = ticket_id.parse().unwrap();

    // Another unit of work holds the row lock
    let mut holder = ctx.store.begin().await.unwrap();
    holder.lock_ticket(ticket_uuid).await.unwrap();

    let blocked = ctx.purchase(&buyer, ticket_id, 1).await;
    assert_eq!(blocked.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(blocked.headers[header::RETRY_AFTER], "1");
    assert_eq!(blocked.body["error"], "service_unavailable");

    drop(holder);

    let stock = ctx.get(&format!("/tickets/{}", ticket_id), None).await;
    assert_eq!(stock.body["remaining_quantity"], 2);
    assert!(ctx.store.payments_for_ticket(ticket_uuid).await.is_empty());

    let retried = tokio::time::timeout(Duration::from_secs(1), ctx.purchase(&buyer, ticket_id, 1))
        .await
        .expect("lock should be free after the holder is dropped");
    assert_eq!(retried.status, StatusCode::CREATED);
}
