//! Checkout, payment verification and the gateway webhook
//!
//! Flow: the client asks for a payment on a pending order, completes
//! checkout with the gateway, then posts the signed result to
//! `/payments/verify`. The gateway also reports captures and failures to
//! `/payments/webhook`; either path may arrive first. A capture that lands
//! on an order cancelled in the meantime is refunded on the spot.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DbError, OrderRepo, Payment, PaymentRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireAdmin, RequireUser, ValidUuid};
use crate::http::routes::orders::refund_payment;
use crate::http::server::AppState;
use crate::models::{OrderStatus, Paginated, PaginationParams, PaymentStatus};
use crate::payments::{verify_payment, verify_webhook};

/// Header carrying the webhook body signature
const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// What the client needs to open the checkout widget
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub payment_id: Uuid,
    pub gateway_order_id: String,
    pub amount_paise: i64,
    pub currency: String,
    pub key_id: String,
}

impl CheckoutResponse {
    fn new(payment: Payment, key_id: &str) -> Self {
        Self {
            payment_id: payment.id,
            gateway_order_id: payment.gateway_order_id,
            amount_paise: payment.amount_paise,
            currency: payment.currency,
            key_id: key_id.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayment {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
}

impl WebhookEvent {
    /// `(gateway_order_id, gateway_payment_id)` of the payment entity
    fn payment_ids(&self) -> Option<(&str, &str)> {
        let entity = &self.payload.payment.as_ref()?.entity;
        Some((entity.order_id.as_deref()?, entity.id.as_str()))
    }
}

/// POST /orders/{id}/payment
async fn start_payment(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    ValidUuid(order_id): ValidUuid,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let order = OrderRepo::new(&state.pool).get(order_id).await?;
    if order.user_id != user_id {
        return Err(ApiError::forbidden("not permitted to pay for this order"));
    }
    if order.status != OrderStatus::Pending {
        return Err(ApiError::conflict(format!(
            "order is {}; only pending orders can be paid",
            order.status
        )));
    }

    let payments = PaymentRepo::new(&state.pool);
    let key_id = state.gateway.key_id();

    let existing = payments.find_by_order(order_id).await?;
    let payment = match existing {
        Some(p) if p.status == PaymentStatus::Created => {
            return Ok((StatusCode::OK, Json(CheckoutResponse::new(p, key_id))));
        }
        Some(p) if p.status == PaymentStatus::Failed => {
            let gateway_order = state
                .gateway
                .create_order(order.total_paise, &state.settings.currency, &receipt(order_id))
                .await?;
            payments
                .reopen(p.id, &gateway_order.id, order.total_paise)
                .await?
        }
        Some(_) => return Err(ApiError::conflict("order is already paid")),
        None => {
            let gateway_order = state
                .gateway
                .create_order(order.total_paise, &state.settings.currency, &receipt(order_id))
                .await?;
            payments
                .create(
                    order_id,
                    &gateway_order.id,
                    order.total_paise,
                    &state.settings.currency,
                )
                .await?
        }
    };

    Ok((StatusCode::CREATED, Json(CheckoutResponse::new(payment, key_id))))
}

/// Gateway receipts are capped at 40 characters
fn receipt(order_id: Uuid) -> String {
    order_id.simple().to_string()
}

/// POST /payments/verify
async fn verify(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Payment>, ApiError> {
    let secret = &state.settings.payment_key_secret;
    if secret.is_empty() {
        return Err(ApiError::internal("payment key secret is not configured"));
    }

    let payments = PaymentRepo::new(&state.pool);
    let payment = payments.find_by_gateway_order(&req.gateway_order_id).await?;
    let order = OrderRepo::new(&state.pool).get(payment.order_id).await?;
    if order.user_id != user_id {
        return Err(ApiError::forbidden("not permitted to verify this payment"));
    }

    if !verify_payment(
        secret,
        &req.gateway_order_id,
        &req.gateway_payment_id,
        &req.signature,
    ) {
        tracing::warn!(order_id = %order.id, "payment signature mismatch");
        payments
            .mark_failed(&req.gateway_order_id, Some(&req.gateway_payment_id))
            .await?;
        return Err(ApiError::bad_request("payment signature is invalid"));
    }

    let payment = payments
        .capture(&req.gateway_order_id, &req.gateway_payment_id)
        .await?;
    Ok(Json(refund_if_cancelled(&state, payment).await?))
}

/// Refund a capture whose order was cancelled before the money arrived.
async fn refund_if_cancelled(state: &AppState, payment: Payment) -> Result<Payment, ApiError> {
    if payment.status != PaymentStatus::Captured {
        return Ok(payment);
    }
    let order = OrderRepo::new(&state.pool).get(payment.order_id).await?;
    if order.status != OrderStatus::Cancelled {
        return Ok(payment);
    }
    tracing::info!(order_id = %order.id, "refunding capture for cancelled order");
    refund_payment(state, &payment).await
}

/// POST /payments/webhook
async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let secret = &state.settings.webhook_secret;
    if secret.is_empty() {
        return Err(ApiError::forbidden("webhooks are not configured"));
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("missing webhook signature"))?;

    if !verify_webhook(secret, &body, signature) {
        tracing::warn!("webhook signature mismatch");
        return Err(ApiError::bad_request("invalid webhook signature"));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("malformed webhook body: {e}")))?;

    let payments = PaymentRepo::new(&state.pool);
    let outcome = match (event.event.as_str(), event.payment_ids()) {
        ("payment.captured", Some((order_id, payment_id))) => {
            match payments.capture(order_id, payment_id).await {
                Ok(payment) => {
                    // A failed refund is a 502 so the gateway redelivers the event
                    refund_if_cancelled(&state, payment).await?;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        ("payment.failed", Some((order_id, payment_id))) => payments
            .mark_failed(order_id, Some(payment_id))
            .await
            .map(|_| ()),
        (other, _) => {
            tracing::debug!(event = other, "ignoring webhook event");
            return Ok(Json(serde_json::json!({ "status": "ignored" })));
        }
    };

    webhook_outcome(&event.event, outcome)
}

fn webhook_outcome(
    event: &str,
    outcome: Result<(), DbError>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match outcome {
        Ok(()) => {}
        // Acknowledge so the gateway stops retrying; nothing to change here
        Err(DbError::NotFound { id, .. }) => {
            tracing::warn!(gateway_order_id = %id, "webhook for unknown payment");
        }
        Err(DbError::InvalidState(reason)) => {
            tracing::warn!(event, %reason, "webhook not applied");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// GET /admin/payments
async fn list_payments(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<Payment>>, ApiError> {
    let payments = PaymentRepo::new(&state.pool).list(params.into()).await?;
    Ok(Json(payments))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/{id}/payment", post(start_payment))
        .route("/payments/verify", post(verify))
        .route("/payments/webhook", post(webhook))
        .route("/admin/payments", get(list_payments))
}
