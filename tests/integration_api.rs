//! API Integration Tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tower::util::ServiceExt;

use wallet_ledger::api;

mod common;

struct Caller {
    account_id: i64,
    token: String,
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, caller: &Caller, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Account-Id", caller.account_id.to_string())
        .header("Authorization", format!("Bearer {}", caller.token));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal serialized as string")).unwrap()
}

/// Register and log in a fresh account
async fn sign_up(app: &Router, name: &str) -> Caller {
    let registration = common::unique_registration(name);

    let (status, json) = send(
        app,
        post_json(
            "/accounts",
            json!({
                "name": registration.name,
                "email": registration.email,
                "number": registration.number,
                "pin": registration.pin,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {json}");
    let account_id = json["account_id"].as_i64().unwrap();

    let (status, json) = send(
        app,
        post_json(
            "/sessions",
            json!({ "identifier": registration.email, "pin": registration.pin }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    assert_eq!(json["account_id"].as_i64(), Some(account_id));

    Caller {
        account_id,
        token: json["token"].as_str().unwrap().to_string(),
    }
}

fn app() -> Router {
    let (state, _store) = common::memory_state();
    api::build_router(state)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));
}

#[tokio::test]
async fn test_cash_in_transfer_e2e() {
    let app = app();
    let alice = sign_up(&app, "Alice").await;
    let bob = sign_up(&app, "Bob").await;

    // 1. No balance row yet
    let (status, _) = send(&app, authed("GET", "/balance", &alice, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 2. Cash in 200.00
    let (status, json) = send(
        &app,
        authed("POST", "/cash-in", &alice, Some(json!({ "amount": "200.00" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "cash-in failed: {json}");
    assert_eq!(decimal(&json["balance"]), Decimal::from(200));

    // 3. Transfer 50.00 to Bob
    let (status, json) = send(
        &app,
        authed(
            "POST",
            "/transfers",
            &alice,
            Some(json!({ "to_account_id": bob.account_id, "amount": "50.00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "transfer failed: {json}");
    assert_eq!(json["code"], 0);
    assert_eq!(json["status"], "completed");

    // 4. Balances
    let (_, json) = send(&app, authed("GET", "/balance", &alice, None)).await;
    assert_eq!(decimal(&json["balance"]), Decimal::from(150));
    let (_, json) = send(&app, authed("GET", "/balance", &bob, None)).await;
    assert_eq!(decimal(&json["balance"]), Decimal::from(50));

    // 5. History, newest first
    let (status, json) = send(&app, authed("GET", "/transactions", &alice, None)).await;
    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["kind"], "transfer_out");
    assert_eq!(decimal(&records[0]["amount"]), Decimal::from(-50));
    assert_eq!(records[1]["label"], "Cash In");

    // 6. Paging
    let (_, json) = send(&app, authed("GET", "/transactions?limit=1&offset=1", &alice, None)).await;
    let page = json.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["label"], "Cash In");

    // 7. Single record, owner only
    let own_id = records[0]["id"].as_i64().unwrap();
    let (status, _) = send(&app, authed("GET", &format!("/transactions/{own_id}"), &alice, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, authed("GET", &format!("/transactions/{own_id}"), &bob, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transfer_failures_carry_codes() {
    let app = app();
    let alice = sign_up(&app, "Alice").await;
    let bob = sign_up(&app, "Bob").await;
    send(&app, authed("POST", "/cash-in", &alice, Some(json!({ "amount": "100" })))).await;

    let cases = [
        (json!({ "to_account_id": bob.account_id, "amount": "150" }), StatusCode::UNPROCESSABLE_ENTITY, 1),
        (json!({ "to_account_id": 9999, "amount": "10" }), StatusCode::NOT_FOUND, 2),
        (json!({ "to_account_id": alice.account_id, "amount": "10" }), StatusCode::BAD_REQUEST, 3),
        (json!({ "to_account_id": bob.account_id, "amount": "0" }), StatusCode::BAD_REQUEST, 5),
        (json!({ "to_account_id": bob.account_id, "amount": "abc" }), StatusCode::BAD_REQUEST, 5),
    ];

    for (body, status, code) in cases {
        let (actual_status, json) = send(&app, authed("POST", "/transfers", &alice, Some(body.clone()))).await;
        assert_eq!(actual_status, status, "body {body}");
        assert_eq!(json["code"], code, "body {body}");
    }

    let (_, json) = send(&app, authed("GET", "/balance", &alice, None)).await;
    assert_eq!(decimal(&json["balance"]), Decimal::from(100));
}

#[tokio::test]
async fn test_session_required() {
    let app = app();
    let alice = sign_up(&app, "Alice").await;

    // Missing headers
    let request = Request::builder().uri("/balance").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Forged token
    let forged = Caller {
        account_id: alice.account_id,
        token: "0".repeat(64),
    };
    let (status, json) = send(&app, authed("GET", "/balance", &forged, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error_code"], "unauthorized");

    // Logout ends the session
    let (status, _) = send(&app, authed("DELETE", "/sessions/current", &alice, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, authed("GET", "/balance", &alice, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_and_pin_change() {
    let app = app();
    let registration = common::unique_registration("Carol");
    let body = json!({
        "name": registration.name,
        "email": registration.email,
        "number": registration.number,
        "pin": "12",
    });
    let (status, json) = send(&app, post_json("/accounts", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_code"], "invalid_registration");

    let carol = sign_up(&app, "Carol").await;
    let (status, _) = send(
        &app,
        authed("PUT", "/accounts/pin", &carol, Some(json!({ "old_pin": "1234", "new_pin": "5678" }))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(
        &app,
        authed("PUT", "/accounts/pin", &carol, Some(json!({ "old_pin": "1234", "new_pin": "0000" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error_code"], "invalid_credentials");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = app();
    let registration = common::unique_registration("Dave");
    let body = json!({
        "name": registration.name,
        "email": registration.email,
        "number": registration.number,
        "pin": registration.pin,
    });

    let (status, _) = send(&app, post_json("/accounts", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, json) = send(&app, post_json("/accounts", body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error_code"], "already_registered");
}
