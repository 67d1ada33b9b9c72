//! In-process tests for the HTTP surface.
//!
//! The router is built on the in-memory store and driven with
//! `tower::ServiceExt::oneshot`; no socket or database is involved.

use avia_api::{app, AppState};
use avia_core::{hash_password, AuthConfig, NewUser, Role, UserRepository};
use avia_store::{MemoryStore, Repositories};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSWORD: &str = "correct horse";

struct TestApp {
    store: MemoryStore,
    router: Router,
}

fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let auth = AuthConfig { jwt_secret: "test-secret".to_string(), jwt_expiration_seconds: 3600 };
    let state = AppState::new(Repositories::in_memory(store.clone()), auth, false);
    TestApp { store, router: app(state) }
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = call(&app.router, request(method, uri, token, body)).await;
    let json = if bytes.is_empty() { Value::Null } else { parse_json(bytes) };
    (status, json)
}

fn registration(phone: &str) -> Value {
    json!({
        "first_name": "Ivan",
        "last_name": "Petrov",
        "phone": phone,
        "document_number": "4510 123456",
        "password": PASSWORD,
    })
}

async fn login(app: &TestApp, phone: &str) -> String {
    let (status, json) =
        send(app, Method::POST, "/api/auth/login", None, Some(json!({ "phone": phone, "password": PASSWORD }))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["token"].as_str().expect("token").to_string()
}

async fn customer(app: &TestApp, phone: &str) -> String {
    let (status, _) = send(app, Method::POST, "/api/auth/register", None, Some(registration(phone))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    login(app, phone).await
}

async fn admin(app: &TestApp) -> String {
    let phone = "70000000001";
    app.store
        .create(NewUser {
            first_name: "Admin".into(),
            last_name: "Root".into(),
            phone: phone.into(),
            document_number: "0000".into(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: Role::Admin,
        })
        .await
        .unwrap();
    login(app, phone).await
}

/// Creates an SVO → LED flight through the admin API and returns its id.
async fn flight(app: &TestApp, admin_token: &str, seats: i32, price: i64) -> i64 {
    let (status, json) = send(
        app,
        Method::POST,
        "/api/admin/flights",
        Some(admin_token),
        Some(json!({
            "flight_number": "SU1234",
            "departure_airport": "SVO",
            "arrival_airport": "LED",
            "departure_time": "2030-05-01T10:00:00Z",
            "arrival_time": "2030-05-01T11:30:00Z",
            "price": price,
            "seats_total": seats,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["flight"]["id"].as_i64().unwrap()
}

async fn available_seats(app: &TestApp, flight_id: i64) -> i64 {
    let (_, json) = send(app, Method::GET, "/api/flights/search", None, None).await;
    json["flights"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["id"] == flight_id)
        .map(|f| f["available_seats"].as_i64().unwrap())
        .unwrap_or(0)
}

async fn buy(app: &TestApp, token: &str, flight_id: i64) -> Value {
    let (status, _) =
        send(app, Method::POST, "/api/cart", Some(token), Some(json!({ "flight_id": flight_id }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(app, Method::POST, "/api/orders/checkout", Some(token), None).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["order"].clone()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_rejects_short_password_before_other_fields() {
    let app = test_app();
    let mut body = registration("79001234567");
    body["password"] = json!("short");
    body["first_name"] = json!("");

    let (status, json) = send(&app, Method::POST, "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], 422);
    assert_eq!(json["error"]["message"], "Validation error");
    assert_eq!(json["error"]["errors"], json!({ "password": ["Too short"] }));
}

#[tokio::test]
async fn register_validates_phone_and_rejects_duplicates() {
    let app = test_app();

    let (status, json) =
        send(&app, Method::POST, "/api/auth/register", None, Some(registration("+7 900 123"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"]["errors"]["phone"].is_array());

    customer(&app, "79001234567").await;
    let (status, json) =
        send(&app, Method::POST, "/api/auth/register", None, Some(registration("79001234567"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Phone already in use");
}

#[tokio::test]
async fn login_failures() {
    let app = test_app();
    customer(&app, "79001234567").await;

    let (status, json) =
        send(&app, Method::POST, "/api/auth/login", None, Some(json!({ "phone": "79001234567" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["errors"]["password"], json!(["Required"]));

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "phone": "79001234567", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn login_returns_token_with_ttl() {
    let app = test_app();
    customer(&app, "79001234567").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "phone": "79001234567", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["expires_in"], 3600);
    assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = test_app();

    let (status, json) = send(&app, Method::GET, "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], 401);

    let (status, _) = send(&app, Method::GET, "/api/profile", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;

    let (status, _) = send(&app, Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&app, Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Token has been revoked");
}

#[tokio::test]
async fn profile_read_and_partial_update() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    customer(&app, "79007654321").await;

    let (status, json) = send(&app, Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["profile"]["first_name"], "Ivan");
    assert_eq!(json["profile"]["phone"], "79001234567");
    assert!(json["profile"]["photo_url"].is_null());

    let (status, json) =
        send(&app, Method::PATCH, "/api/profile", Some(&token), Some(json!({ "first_name": "Pyotr" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["profile"]["first_name"], "Pyotr");
    assert_eq!(json["profile"]["last_name"], "Petrov");

    let (status, json) =
        send(&app, Method::PATCH, "/api/profile", Some(&token), Some(json!({ "phone": "79007654321" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["errors"]["phone"], json!(["Already in use"]));
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_filters_by_city_date_and_passengers() {
    let app = test_app();
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 3, 12_000).await;

    let (status, json) =
        send(&app, Method::GET, "/api/flights/search?from=mosc&to=PETERS&date=2030-05-01", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    let row = &json["flights"][0];
    assert_eq!(row["id"], flight_id);
    assert_eq!(row["from"], "Moscow (SVO)");
    assert_eq!(row["to"], "Saint Petersburg (LED)");
    assert_eq!(row["available_seats"], 3);
    assert_eq!(row["category"], "economy");

    let (_, json) = send(&app, Method::GET, "/api/flights/search?from=Kazan", None, None).await;
    assert_eq!(json["total"], 0);

    let (_, json) = send(&app, Method::GET, "/api/flights/search?passengers=4", None, None).await;
    assert_eq!(json["total"], 0);

    let (_, json) = send(&app, Method::GET, "/api/flights/search?date=2030-05-02", None, None).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn search_rejects_bad_date() {
    let app = test_app();
    let (status, json) = send(&app, Method::GET, "/api/flights/search?date=01.05.2030", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Invalid date format");
}

// ---------------------------------------------------------------------------
// Cart and checkout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_add_errors() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let full = flight(&app, &admin_token, 0, 100).await;

    let (status, json) = send(&app, Method::POST, "/api/cart", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["errors"]["flight_id"], json!(["Required"]));

    let (status, json) =
        send(&app, Method::POST, "/api/cart", Some(&token), Some(json!({ "flight_id": 9999 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Flight not found");

    let (status, json) =
        send(&app, Method::POST, "/api/cart", Some(&token), Some(json!({ "flight_id": full }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "No available seats");
}

#[tokio::test]
async fn cart_uses_account_name_for_blank_passenger() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 5, 100).await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/cart",
        Some(&token),
        Some(json!({ "flight_id": flight_id, "passenger_name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["passenger_name"], "Ivan Petrov");
    let item_id = json["id"].as_i64().unwrap();

    let (_, json) = send(&app, Method::GET, "/api/cart", Some(&token), None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["flight"]["flight_number"], "SU1234");
    assert_eq!(json["items"][0]["flight"]["price"], 100);

    let other = customer(&app, "79007654321").await;
    let (status, json) = send(&app, Method::DELETE, &format!("/api/cart/{}", item_id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Item not found");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/cart/{}", item_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn checkout_issues_tickets_and_empties_cart() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 3, 100).await;

    let order = buy(&app, &token, flight_id).await;
    assert_eq!(order["status"], "paid");
    assert_eq!(order["total"], 100);
    let tickets = order["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["passenger"], "Ivan Petrov");
    let number = tickets[0]["ticket_number"].as_str().unwrap();
    assert!(number.starts_with("ETK-") && number.len() == 17, "{number}");

    assert_eq!(available_seats(&app, flight_id).await, 2);

    let (_, json) = send(&app, Method::GET, "/api/cart", Some(&token), None).await;
    assert_eq!(json["total"], 0);

    let (status, json) = send(&app, Method::GET, "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["orders"][0]["tickets_count"], 1);
    assert_eq!(json["orders"][0]["status"], "paid");
}

#[tokio::test]
async fn checkout_of_empty_cart_is_bad_request() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;

    let (status, json) = send(&app, Method::POST, "/api/orders/checkout", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Cart is empty");
}

#[tokio::test]
async fn checkout_conflicts_when_seats_ran_out() {
    let app = test_app();
    let alice = customer(&app, "79001234567").await;
    let bob = customer(&app, "79007654321").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 1, 100).await;

    let (status, _) =
        send(&app, Method::POST, "/api/cart", Some(&alice), Some(json!({ "flight_id": flight_id }))).await;
    assert_eq!(status, StatusCode::CREATED);

    buy(&app, &bob, flight_id).await;

    let (status, json) = send(&app, Method::POST, "/api/orders/checkout", Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "One or more seats no longer available");

    let (_, json) = send(&app, Method::GET, "/api/cart", Some(&alice), None).await;
    assert_eq!(json["total"], 1);
}

// ---------------------------------------------------------------------------
// Order status changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn customer_cannot_touch_foreign_orders() {
    let app = test_app();
    let alice = customer(&app, "79001234567").await;
    let bob = customer(&app, "79007654321").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 3, 100).await;

    let order = buy(&app, &alice, flight_id).await;
    let uri = format!("/api/orders/{}", order["id"]);

    let (status, json) =
        send(&app, Method::PATCH, &uri, Some(&bob), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Order not found");

    let (status, json) =
        send(&app, Method::PATCH, &uri, Some(&alice), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "cancelled");
    assert!(json["order"]["refund_status"].is_null());
    assert_eq!(available_seats(&app, flight_id).await, 2);
}

#[tokio::test]
async fn status_change_errors_list_allowed_statuses() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 3, 100).await;
    let order = buy(&app, &token, flight_id).await;
    let uri = format!("/api/admin/orders/{}", order["id"]);

    let (status, json) = send(&app, Method::PATCH, &uri, Some(&admin_token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["errors"]["status"], json!(["Required"]));
    assert_eq!(json["error"]["current_status"], "paid");

    let (status, json) =
        send(&app, Method::PATCH, &uri, Some(&admin_token), Some(json!({ "status": "pending" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Invalid status transition");
    assert_eq!(json["error"]["requested_status"], "pending");
    assert_eq!(json["error"]["available_statuses"], json!(["cancelled", "refunded"]));
}

#[tokio::test]
async fn admin_refund_releases_seats() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 5, 100).await;

    buy(&app, &token, flight_id).await;
    let order = buy(&app, &token, flight_id).await;
    assert_eq!(available_seats(&app, flight_id).await, 3);

    let uri = format!("/api/admin/orders/{}", order["id"]);
    let (status, json) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin_token),
        Some(json!({ "status": "cancelled", "refund": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "cancelled");
    assert_eq!(json["order"]["refund_status"], "processed");
    assert_eq!(available_seats(&app, flight_id).await, 4);

    let (status, json) =
        send(&app, Method::PATCH, &uri, Some(&admin_token), Some(json!({ "status": "paid" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["available_statuses"], json!([]));

    let (_, json) = send(&app, Method::GET, "/api/admin/orders", Some(&admin_token), None).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["orders"][0]["user_name"], "Ivan Petrov");
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_are_forbidden_for_customers() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;

    let (status, json) = send(&app, Method::GET, "/api/admin/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], 403);

    let (status, _) = send(&app, Method::GET, "/api/admin/flights", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_flight_create_rejects_unknown_airport() {
    let app = test_app();
    let admin_token = admin(&app).await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/admin/flights",
        Some(&admin_token),
        Some(json!({
            "flight_number": "SU1",
            "departure_airport": "XXX",
            "arrival_airport": "LED",
            "departure_time": "2030-05-01T10:00:00Z",
            "arrival_time": "2030-05-01T11:30:00Z",
            "price": 100,
            "seats_total": 10,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["errors"], json!({ "departure_airport": ["Airport not found"] }));
}

#[tokio::test]
async fn admin_flight_update_clamps_availability() {
    let app = test_app();
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 10, 100).await;
    let uri = format!("/api/admin/flights/{}", flight_id);

    let (status, json) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin_token),
        Some(json!({ "seats_total": 4, "price": 250 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["flight"], json!({ "id": flight_id, "price": 250, "seats_total": 4, "seats_available": 4 }));

    let (status, _) =
        send(&app, Method::PATCH, "/api/admin/flights/9999", Some(&admin_token), Some(json!({ "price": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, Method::GET, "/api/admin/flights", Some(&admin_token), None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["flights"][0]["departure_airport"], "SVO");
}

#[tokio::test]
async fn admin_deletes_respect_paid_orders() {
    let app = test_app();
    let token = customer(&app, "79001234567").await;
    let admin_token = admin(&app).await;
    let flight_id = flight(&app, &admin_token, 5, 100).await;
    let order = buy(&app, &token, flight_id).await;

    let flight_uri = format!("/api/admin/flights/{}", flight_id);
    let order_uri = format!("/api/admin/orders/{}", order["id"]);

    let (status, json) = send(&app, Method::DELETE, &flight_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Cannot delete flight with paid orders");

    let (status, _) = send(&app, Method::DELETE, &order_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
        send(&app, Method::PATCH, &order_uri, Some(&admin_token), Some(json!({ "status": "refunded" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &order_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &flight_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &flight_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
