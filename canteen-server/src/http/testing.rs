//! Router test harness: stub gateway and image store over a pool that
//! never connects. Requests must be rejected before reaching Postgres.
//! Database-backed tests swap in a real pool with `state_with`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use canteen_core::AppConfig;
use tower::ServiceExt;
use uuid::Uuid;

use super::server::{build_router, AppState, Settings};
use crate::auth::TokenKeys;
use crate::db::lazy_pool;
use crate::models::Role;
use sqlx::PgPool;
use crate::payments::{GatewayError, GatewayOrder, GatewayRefund, PaymentGateway};
use crate::storage::{ImageError, ImageStore, UploadedImage};

pub const JWT_SECRET: &[u8] = b"test-secret-test-secret-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Default)]
pub struct StubGateway {
    /// `(gateway payment id, amount)` of every refund that went through
    pub refunds: Mutex<Vec<(String, i64)>>,
    /// While set, refunds fail the way an unreachable gateway does
    pub refunds_down: AtomicBool,
}

impl StubGateway {
    pub fn set_refunds_down(&self, down: bool) {
        self.refunds_down.store(down, Ordering::SeqCst);
    }

    pub fn refunded(&self) -> Vec<(String, i64)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        Ok(GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: amount_paise,
            currency: currency.to_owned(),
            receipt: Some(receipt.to_owned()),
        })
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount_paise: i64,
    ) -> Result<GatewayRefund, GatewayError> {
        if self.refunds_down.load(Ordering::SeqCst) {
            return Err(GatewayError::api(503, "service unavailable".into()));
        }
        self.refunds
            .lock()
            .unwrap()
            .push((payment_id.to_owned(), amount_paise));
        Ok(GatewayRefund {
            id: format!("rfnd_{}", Uuid::new_v4().simple()),
            payment_id: payment_id.to_owned(),
            amount: amount_paise,
        })
    }
}

pub struct StubImages;

#[async_trait]
impl ImageStore for StubImages {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        filename: &str,
        _content_type: &str,
        folder: &str,
    ) -> Result<UploadedImage, ImageError> {
        Ok(UploadedImage {
            url: format!("https://images.test/{folder}/{filename}"),
            public_id: format!("{folder}/{filename}"),
        })
    }
}

pub const KEY_SECRET: &str = "key_secret_test";

pub fn state() -> AppState {
    let pool = lazy_pool("postgres://canteen@127.0.0.1:1/canteen_test").expect("lazy pool");
    state_with(pool, Arc::new(StubGateway::default()))
}

pub fn state_with(pool: PgPool, gateway: Arc<StubGateway>) -> AppState {
    let mut config = AppConfig::default();
    config.payments.webhook_secret = WEBHOOK_SECRET.to_owned();
    config.payments.key_secret = KEY_SECRET.to_owned();
    config.images.max_bytes = 1024;

    AppState {
        pool,
        tokens: TokenKeys::new(JWT_SECRET, 1),
        gateway,
        images: Arc::new(StubImages),
        settings: Settings::from_config(&config),
    }
}

pub fn app() -> Router {
    build_router(state(), false)
}

pub fn bearer(role: Role) -> String {
    bearer_for(Uuid::new_v4(), role)
}

pub fn bearer_for(id: Uuid, role: Role) -> String {
    let token = TokenKeys::new(JWT_SECRET, 1)
        .issue(id, role)
        .expect("issue token");
    format!("Bearer {token}")
}

/// Send a request and decode the JSON body (`Null` when empty).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).expect("request")
}
