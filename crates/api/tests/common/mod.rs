#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use buildtrack_api::auth::jwt::{generate_access_token, JwtConfig};
use buildtrack_api::config::ServerConfig;
use buildtrack_api::router::build_app_router;
use buildtrack_api::state::AppState;
use buildtrack_db::models::user::CreateUser;
use buildtrack_db::repositories::UserRepo;
use buildtrack_payments::{PaymentError, PaymentGateway, VerifiedPayment};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio::sync::Notify;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        outbox_poll_interval_secs: 15,
        outbox_batch_size: 50,
        jwt: jwt_config(),
    }
}

// ---------------------------------------------------------------------------
// Payment gateway stub
// ---------------------------------------------------------------------------

/// Gateway that answers from a fixed table of transactions and counts calls.
#[derive(Default)]
pub struct StubGateway {
    payments: Mutex<HashMap<String, VerifiedPayment>>,
    calls: AtomicUsize,
}

impl StubGateway {
    /// Register a transaction the gateway will report.
    pub fn add(&self, transaction_id: &str, tx_ref: &str, amount: f64, status: &str) {
        self.insert(transaction_id, Some(tx_ref), amount, status);
    }

    /// Register a transaction whose verification carries no `tx_ref`.
    pub fn add_unreferenced(&self, transaction_id: &str, amount: f64) {
        self.insert(transaction_id, None, amount, "successful");
    }

    fn insert(&self, transaction_id: &str, tx_ref: Option<&str>, amount: f64, status: &str) {
        let payment = VerifiedPayment {
            transaction_id: transaction_id.to_string(),
            tx_ref: tx_ref.map(str::to_string),
            amount,
            currency: Some("NGN".to_string()),
            status: status.to_string(),
            raw: serde_json::json!({
                "status": "success",
                "data": { "id": transaction_id, "tx_ref": tx_ref, "amount": amount, "status": status }
            }),
        };
        self.payments
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), payment);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedPayment, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payments
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or(PaymentError::Api {
                status: 404,
                body: "No transaction was found for this id".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router against `pool` with an empty stub
/// gateway.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_gateway(pool, Arc::new(StubGateway::default()))
}

/// Build the full application router with a caller-supplied gateway.
pub fn build_test_app_with_gateway(pool: PgPool, gateway: Arc<StubGateway>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        payments: gateway,
        outbox_wakeup: Arc::new(Notify::new()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Insert a user and return its id.
pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            role: role.to_string(),
        },
    )
    .await
    .expect("user insert should succeed")
    .id
}

/// Mint a bearer token for a user.
pub fn token_for(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &jwt_config()).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, empty_request("GET", uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("GET", uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request("POST", uri, None, &body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request("POST", uri, Some(token), &body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("POST", uri, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request("PUT", uri, Some(token), &body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("DELETE", uri, Some(token))).await
}

/// Read the response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
