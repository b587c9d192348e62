//! Ratings and comments on completed orders

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{CanteenRepo, Feedback, FeedbackRepo, OrderRepo, RatingSummary};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::ordering::comment;
use crate::models::{OrderStatus, Paginated, PaginationParams, Rating};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CanteenFeedback {
    #[serde(flatten)]
    pub summary: RatingSummary,
    pub feedback: Paginated<Feedback>,
}

/// POST /orders/{id}/feedback
async fn submit(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    ValidUuid(order_id): ValidUuid,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let rating = Rating::new(req.rating)?;
    let comment = comment(req.comment.as_deref())?;

    let order = OrderRepo::new(&state.pool).get(order_id).await?;
    if order.user_id != user_id {
        return Err(ApiError::forbidden("not permitted to review this order"));
    }
    if order.status != OrderStatus::Completed {
        return Err(ApiError::conflict(format!(
            "order is {}; feedback opens once it is completed",
            order.status
        )));
    }

    let feedback = FeedbackRepo::new(&state.pool)
        .create(order_id, user_id, order.canteen_id, rating, comment)
        .await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /canteens/{id}/feedback
async fn for_canteen(
    State(state): State<Arc<AppState>>,
    ValidUuid(canteen_id): ValidUuid,
    Query(params): Query<PaginationParams>,
) -> Result<Json<CanteenFeedback>, ApiError> {
    // 404 for unknown canteens rather than an empty page
    CanteenRepo::new(&state.pool).get(canteen_id).await?;

    let repo = FeedbackRepo::new(&state.pool);
    let summary = repo.summary(canteen_id).await?;
    let feedback = repo.list_for_canteen(canteen_id, params.into()).await?;
    Ok(Json(CanteenFeedback { summary, feedback }))
}

/// GET /feedback/me
async fn mine(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<Feedback>>, ApiError> {
    let feedback = FeedbackRepo::new(&state.pool)
        .list_for_user(user_id, params.into())
        .await?;
    Ok(Json(feedback))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/{id}/feedback", post(submit))
        .route("/canteens/{id}/feedback", get(for_canteen))
        .route("/feedback/me", get(mine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, bearer, empty_request, json_request, send};
    use crate::models::Role;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn rating_out_of_range_is_400() {
        let auth = bearer(Role::User);
        let uri = format!("/orders/{}/feedback", Uuid::new_v4());
        let req = json_request("POST", &uri, Some(&auth), json!({"rating": 9}));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "rating must be between 1 and 5");
    }

    #[tokio::test]
    async fn staff_cannot_leave_feedback() {
        let auth = bearer(Role::Staff);
        let uri = format!("/orders/{}/feedback", Uuid::new_v4());
        let req = json_request("POST", &uri, Some(&auth), json!({"rating": 4}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn my_feedback_requires_token() {
        let (status, _) = send(app(), empty_request("GET", "/feedback/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn summary_flattens_into_response() {
        let body = CanteenFeedback {
            summary: RatingSummary {
                average_rating: Some(4.5),
                count: 2,
            },
            feedback: crate::models::Pagination::new(1, 20).wrap(Vec::new(), 0),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["average_rating"], 4.5);
        assert_eq!(value["count"], 2);
        assert!(value["feedback"]["items"].is_array());
    }
}
