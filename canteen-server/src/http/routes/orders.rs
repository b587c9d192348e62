//! Order placement, tracking, the kitchen queue and cancellation
//!
//! Cancelling flips the order first and refunds second. A refund that
//! fails after the flip leaves the payment `captured` on a cancelled order
//! and surfaces as 502; cancelling the same order again retries the refund.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{ExamRepo, Order, OrderRepo, Payment, PaymentRepo, PriorityCharge, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{Actor, RequireUser, StaffOrAdmin, ValidUuid};
use crate::http::server::AppState;
use crate::models::{
    check_eligibility, OrderStatus, Paginated, Pagination, PaginationParams, PaymentStatus,
};

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub priority: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /orders
async fn place_order(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let priority = if req.priority {
        Some(priority_charge(&state, user_id).await?)
    } else {
        None
    };

    let order = OrderRepo::new(&state.pool).place(user_id, priority).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Resolve the exam that entitles `user_id` to a priority order today.
async fn priority_charge(state: &AppState, user_id: Uuid) -> Result<PriorityCharge, ApiError> {
    let user = UserRepo::new(&state.pool).get(user_id).await?;
    let today = Local::now().date_naive();
    let exams = ExamRepo::new(&state.pool).active_on(today).await?;

    let university_id = user.university_id();
    let exam = check_eligibility(university_id.as_ref(), &exams, today).map_err(|reason| {
        tracing::debug!(user_id = %user_id, ?reason, "priority refused");
        ApiError::forbidden(reason.to_string())
    })?;

    Ok(PriorityCharge {
        fee_paise: state.settings.ordering.priority_fee_paise,
        exam_id: exam.id,
    })
}

/// GET /orders
async fn my_orders(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let orders = OrderRepo::new(&state.pool)
        .list_for_user(user_id, params.into())
        .await?;
    Ok(Json(orders))
}

/// Owners see their own orders; staff see their canteen's; admins see all.
fn ensure_can_view(actor: &Actor, order: &Order) -> Result<(), ApiError> {
    let allowed = match actor {
        Actor::User { id } => *id == order.user_id,
        _ => actor.can_manage(order.canteen_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ApiError::forbidden("not permitted to access this order"))
    }
}

/// GET /orders/{id}
async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Order>, ApiError> {
    let order = OrderRepo::new(&state.pool).get(id).await?;
    ensure_can_view(&actor, &order)?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Order>, ApiError> {
    let order = OrderRepo::new(&state.pool).get(id).await?;
    ensure_can_view(&actor, &order)?;
    let order = cancel(&state, order).await?;
    tracing::info!(order_id = %id, by = %actor.id(), "order cancelled");
    Ok(Json(order))
}

/// Cancel `order` and settle its payment.
///
/// An order that is already cancelled but still holds a captured payment
/// had its refund fail; only the refund is attempted again.
async fn cancel(state: &AppState, order: Order) -> Result<Order, ApiError> {
    let payments = PaymentRepo::new(&state.pool);

    if order.status == OrderStatus::Cancelled {
        return match payments.find_by_order(order.id).await? {
            Some(payment) if payment.status == PaymentStatus::Captured => {
                tracing::info!(order_id = %order.id, "retrying refund");
                refund_payment(state, &payment).await?;
                Ok(order)
            }
            _ => Err(not_cancellable(order.status)),
        };
    }
    if !order.status.is_cancellable() {
        return Err(not_cancellable(order.status));
    }

    let cancelled = OrderRepo::new(&state.pool)
        .transition(order.id, order.status, OrderStatus::Cancelled)
        .await?;

    match payments.find_by_order(order.id).await? {
        Some(payment) if payment.status == PaymentStatus::Captured => {
            refund_payment(state, &payment).await?;
        }
        Some(payment) if payment.status == PaymentStatus::Created => {
            // Close the checkout so a late capture is rejected
            payments
                .mark_failed(&payment.gateway_order_id, None)
                .await?;
        }
        _ => {}
    }

    Ok(cancelled)
}

fn not_cancellable(status: OrderStatus) -> ApiError {
    ApiError::conflict(format!("order is {status} and can no longer be cancelled"))
}

/// Refund a captured payment in full and record the refund id.
pub(crate) async fn refund_payment(state: &AppState, payment: &Payment) -> Result<Payment, ApiError> {
    let gateway_payment_id = payment.gateway_payment_id.as_deref().ok_or_else(|| {
        ApiError::internal(format!("captured payment {} has no gateway id", payment.id))
    })?;
    let refund = state
        .gateway
        .refund(gateway_payment_id, payment.amount_paise)
        .await?;
    Ok(PaymentRepo::new(&state.pool)
        .mark_refunded(payment.id, &refund.id)
        .await?)
}

/// GET /canteens/{id}/orders
async fn canteen_queue(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(canteen_id): ValidUuid,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    actor.ensure_manages(canteen_id)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });

    let queue = OrderRepo::new(&state.pool)
        .queue(canteen_id, status, page)
        .await?;
    Ok(Json(queue))
}

/// PATCH /orders/{id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let next: OrderStatus = req.status.parse()?;
    let order = OrderRepo::new(&state.pool).get(id).await?;
    actor.ensure_manages(order.canteen_id)?;

    if next == OrderStatus::Cancelled {
        return Ok(Json(cancel(&state, order).await?));
    }

    if !order.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!(
            "cannot move order from {} to {}",
            order.status, next
        )));
    }

    let order = OrderRepo::new(&state.pool)
        .transition(id, order.status, next)
        .await?;
    Ok(Json(order))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(my_orders).post(place_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/status", patch(update_status))
        .route("/canteens/{id}/orders", get(canteen_queue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::http::server::build_router;
    use crate::http::testing::{
        app, bearer, bearer_for, empty_request, json_request, send, state_with, StubGateway,
    };
    use crate::models::Role;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::PgPool;

    fn order(user_id: Uuid, canteen_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id,
            canteen_id,
            items: Vec::new(),
            subtotal_paise: 0,
            is_priority: false,
            priority_fee_paise: 0,
            total_paise: 0,
            status: OrderStatus::Pending,
            exam_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_and_canteen_staff_can_view() {
        let owner = Uuid::new_v4();
        let canteen = Uuid::new_v4();
        let o = order(owner, canteen);

        assert!(ensure_can_view(&Actor::User { id: owner }, &o).is_ok());
        assert!(ensure_can_view(&Actor::User { id: Uuid::new_v4() }, &o).is_err());
        assert!(ensure_can_view(
            &Actor::Staff {
                id: Uuid::new_v4(),
                canteen_id: canteen
            },
            &o
        )
        .is_ok());
        assert!(ensure_can_view(
            &Actor::Staff {
                id: Uuid::new_v4(),
                canteen_id: Uuid::new_v4()
            },
            &o
        )
        .is_err());
        assert!(ensure_can_view(&Actor::Admin { id: Uuid::new_v4() }, &o).is_ok());
    }

    #[tokio::test]
    async fn placing_requires_user_role() {
        let auth = bearer(Role::Admin);
        let req = json_request("POST", "/orders", Some(&auth), json!({"priority": false}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn queue_is_not_for_users() {
        let auth = bearer(Role::User);
        let uri = format!("/canteens/{}/orders", Uuid::new_v4());
        let (status, _) = send(app(), empty_request("GET", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn queue_rejects_unknown_status() {
        let auth = bearer(Role::Admin);
        let uri = format!("/canteens/{}/orders?status=lost", Uuid::new_v4());
        let (status, body) = send(app(), empty_request("GET", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid order status value: 'lost'");
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_status() {
        let auth = bearer(Role::Admin);
        let uri = format!("/orders/{}/status", Uuid::new_v4());
        let req = json_request("PATCH", &uri, Some(&auth), json!({"status": "teleported"}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn priority_defaults_off() {
        let req: PlaceOrderRequest = serde_json::from_value(json!({})).unwrap();
        assert!(!req.priority);
    }

    // Integration tests - run with DATABASE_URL set
    // cargo test -p canteen-server -- --ignored

    /// A confirmed order whose payment has been captured
    async fn paid_order(pool: &PgPool) -> (Uuid, Order, Payment) {
        let (user, order) = fixtures::placed_order(pool, 5_000, 2).await;
        let payments = PaymentRepo::new(pool);
        let gateway_order_id = format!("order_{}", fixtures::suffix());
        payments
            .create(order.id, &gateway_order_id, order.total_paise, "INR")
            .await
            .unwrap();
        let payment = payments
            .capture(&gateway_order_id, &format!("pay_{}", fixtures::suffix()))
            .await
            .unwrap();
        (user.id, order, payment)
    }

    async fn payment_status(pool: &PgPool, order_id: Uuid) -> PaymentStatus {
        PaymentRepo::new(pool)
            .find_by_order(order_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn failed_refund_is_retried_by_cancelling_again() {
        let pool = fixtures::database().await;
        let gateway = Arc::new(StubGateway::default());
        let app = build_router(state_with(pool.clone(), gateway.clone()), false);
        let (user_id, order, payment) = paid_order(&pool).await;
        let auth = bearer_for(user_id, Role::User);
        let uri = format!("/orders/{}/cancel", order.id);

        gateway.set_refunds_down(true);
        let (status, _) = send(app.clone(), empty_request("POST", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let order_now = OrderRepo::new(&pool).get(order.id).await.unwrap();
        assert_eq!(order_now.status, OrderStatus::Cancelled);
        assert_eq!(payment_status(&pool, order.id).await, PaymentStatus::Captured);

        gateway.set_refunds_down(false);
        let (status, body) = send(app.clone(), empty_request("POST", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");
        assert_eq!(payment_status(&pool, order.id).await, PaymentStatus::Refunded);
        assert_eq!(
            gateway.refunded(),
            vec![(payment.gateway_payment_id.unwrap(), order.total_paise)]
        );

        // Nothing left to settle
        let (status, _) = send(app, empty_request("POST", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn admin_status_change_retries_failed_refund() {
        let pool = fixtures::database().await;
        let gateway = Arc::new(StubGateway::default());
        let app = build_router(state_with(pool.clone(), gateway.clone()), false);
        let (user_id, order, _) = paid_order(&pool).await;

        gateway.set_refunds_down(true);
        let cancel = format!("/orders/{}/cancel", order.id);
        let auth = bearer_for(user_id, Role::User);
        let (status, _) = send(app.clone(), empty_request("POST", &cancel, Some(&auth))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        gateway.set_refunds_down(false);
        let uri = format!("/orders/{}/status", order.id);
        let req = json_request("PATCH", &uri, Some(&bearer(Role::Admin)), json!({"status": "cancelled"}));
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payment_status(&pool, order.id).await, PaymentStatus::Refunded);
        assert_eq!(gateway.refunded().len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn cancelling_unpaid_checkout_fails_the_payment() {
        let pool = fixtures::database().await;
        let gateway = Arc::new(StubGateway::default());
        let app = build_router(state_with(pool.clone(), gateway.clone()), false);
        let (user, order) = fixtures::placed_order(&pool, 3_000, 1).await;
        let gateway_order_id = format!("order_{}", fixtures::suffix());
        PaymentRepo::new(&pool)
            .create(order.id, &gateway_order_id, order.total_paise, "INR")
            .await
            .unwrap();

        let uri = format!("/orders/{}/cancel", order.id);
        let auth = bearer_for(user.id, Role::User);
        let (status, _) = send(app, empty_request("POST", &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payment_status(&pool, order.id).await, PaymentStatus::Failed);
        assert!(gateway.refunded().is_empty());

        let late = PaymentRepo::new(&pool).capture(&gateway_order_id, "pay_late").await;
        assert!(matches!(late, Err(crate::db::DbError::InvalidState(_))));
    }
}
