//! Cart endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{CartRepo, CartView, MenuRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::Quantity;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub menu_item_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

/// GET /cart
async fn get_cart(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartRepo::new(&state.pool).view(user_id).await?;
    Ok(Json(cart))
}

/// POST /cart/items
async fn add_item(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let max = state.settings.ordering.max_item_quantity;
    let quantity = Quantity::new(req.quantity, max)?;

    let item = MenuRepo::new(&state.pool).get(req.menu_item_id).await?;
    if !item.is_available {
        return Err(ApiError::conflict(format!("{} is not available", item.name)));
    }

    let cart = CartRepo::new(&state.pool)
        .add_item(user_id, &item, quantity, max)
        .await?;
    Ok(Json(cart))
}

/// PUT /cart/items/{menu_item_id}
async fn set_quantity(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    ValidUuid(menu_item_id): ValidUuid,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let quantity = Quantity::new(req.quantity, state.settings.ordering.max_item_quantity)?;
    let cart = CartRepo::new(&state.pool)
        .set_quantity(user_id, menu_item_id, quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /cart/items/{menu_item_id}
async fn remove_item(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    ValidUuid(menu_item_id): ValidUuid,
) -> Result<Json<CartView>, ApiError> {
    let cart = CartRepo::new(&state.pool)
        .remove_item(user_id, menu_item_id)
        .await?;
    Ok(Json(cart))
}

/// DELETE /cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
) -> Result<StatusCode, ApiError> {
    CartRepo::new(&state.pool).clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/{menu_item_id}",
            put(set_quantity).delete(remove_item),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, bearer, empty_request, json_request, send};
    use crate::models::Role;
    use serde_json::json;

    #[tokio::test]
    async fn cart_is_user_only() {
        let auth = bearer(Role::Admin);
        let (status, _) = send(app(), empty_request("GET", "/cart", Some(&auth))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn quantity_over_limit_is_400() {
        let auth = bearer(Role::User);
        let req = json_request(
            "POST",
            "/cart/items",
            Some(&auth),
            json!({"menu_item_id": Uuid::new_v4(), "quantity": 500}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "quantity must be between 1 and 20");
    }

    #[tokio::test]
    async fn zero_quantity_update_is_400() {
        let auth = bearer(Role::User);
        let uri = format!("/cart/items/{}", Uuid::new_v4());
        let req = json_request("PUT", &uri, Some(&auth), json!({"quantity": 0}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn quantity_defaults_to_one() {
        let req: AddItemRequest =
            serde_json::from_value(json!({"menu_item_id": Uuid::nil()})).unwrap();
        assert_eq!(req.quantity, 1);
    }
}
