//! Menu endpoints

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::upload;
use crate::db::{CanteenRepo, MenuFilter, MenuItem, MenuItemPatch, MenuRepo, NewMenuItem};
use crate::http::error::ApiError;
use crate::http::extractors::{StaffOrAdmin, ValidUuid};
use crate::http::server::AppState;
use crate::models::catalog::description;
use crate::models::{Category, ItemName, Price};

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub category: Option<String>,
    /// `true` hides sold-out items
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    pub category: String,
    #[serde(default = "default_true")]
    pub is_veg: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_paise: Option<i64>,
    pub category: Option<String>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
}

impl UpdateItemRequest {
    fn validate(&self) -> Result<MenuItemPatch, ApiError> {
        Ok(MenuItemPatch {
            name: self.name.as_deref().map(ItemName::new).transpose()?,
            description: description(self.description.as_deref())?,
            price: self.price_paise.map(Price::new).transpose()?,
            category: self.category.as_deref().map(Category::new).transpose()?,
            is_veg: self.is_veg,
            is_available: self.is_available,
        })
    }
}

/// GET /canteens/{id}/menu
async fn list_menu(
    State(state): State<Arc<AppState>>,
    ValidUuid(canteen_id): ValidUuid,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let filter = MenuFilter {
        category: query.category.as_deref().map(Category::new).transpose()?,
        available_only: query.available.unwrap_or(false),
    };

    // Unknown canteen is a 404, not an empty menu
    CanteenRepo::new(&state.pool).get(canteen_id).await?;
    let items = MenuRepo::new(&state.pool)
        .list_for_canteen(canteen_id, &filter)
        .await?;
    Ok(Json(items))
}

/// POST /canteens/{id}/menu
async fn create_item(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(canteen_id): ValidUuid,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    actor.ensure_manages(canteen_id)?;
    let new = NewMenuItem {
        name: ItemName::new(&req.name)?,
        description: description(req.description.as_deref())?,
        price: Price::new(req.price_paise)?,
        category: Category::new(&req.category)?,
        is_veg: req.is_veg,
        is_available: req.is_available,
    };

    CanteenRepo::new(&state.pool).get(canteen_id).await?;
    let item = MenuRepo::new(&state.pool).create(canteen_id, new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /menu/{id}
async fn get_item(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<MenuItem>, ApiError> {
    let item = MenuRepo::new(&state.pool).get(id).await?;
    Ok(Json(item))
}

/// PATCH /menu/{id}
async fn update_item(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    let patch = req.validate()?;
    let repo = MenuRepo::new(&state.pool);
    let current = repo.get(id).await?;
    actor.ensure_manages(current.canteen_id)?;

    let item = repo.update(id, patch).await?;
    Ok(Json(item))
}

/// DELETE /menu/{id}
async fn delete_item(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    let repo = MenuRepo::new(&state.pool);
    let current = repo.get(id).await?;
    actor.ensure_manages(current.canteen_id)?;

    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /menu/{id}/image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
    multipart: Multipart,
) -> Result<Json<MenuItem>, ApiError> {
    let repo = MenuRepo::new(&state.pool);
    let current = repo.get(id).await?;
    actor.ensure_manages(current.canteen_id)?;

    let file = upload::read_image(multipart, state.settings.max_image_bytes).await?;
    let image = upload::store(&state, file, "menu").await?;
    let item = repo.set_image(id, &image.url).await?;

    Ok(Json(item))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/canteens/{id}/menu", get(list_menu).post(create_item))
        .route(
            "/menu/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/menu/{id}/image", post(upload_image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, bearer, json_request, send};
    use crate::models::Role;
    use serde_json::json;

    #[tokio::test]
    async fn create_item_rejects_negative_price() {
        let auth = bearer(Role::Admin);
        let uri = format!("/canteens/{}/menu", uuid::Uuid::new_v4());
        let req = json_request(
            "POST",
            &uri,
            Some(&auth),
            json!({"name": "Samosa", "price_paise": -100, "category": "snacks"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn users_cannot_add_items() {
        let auth = bearer(Role::User);
        let uri = format!("/canteens/{}/menu", uuid::Uuid::new_v4());
        let req = json_request(
            "POST",
            &uri,
            Some(&auth),
            json!({"name": "Samosa", "price_paise": 1500, "category": "snacks"}),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn create_defaults_to_veg_and_available() {
        let req: CreateItemRequest = serde_json::from_value(
            json!({"name": "Idli", "price_paise": 3000, "category": "breakfast"}),
        )
        .unwrap();
        assert!(req.is_veg);
        assert!(req.is_available);
    }
}
