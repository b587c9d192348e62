//! Canteen directory endpoints

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveTime;
use serde::Deserialize;

use super::upload;
use crate::db::{Canteen, CanteenPatch, CanteenRepo, CanteenWithRating, NewCanteen};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireAdmin, StaffOrAdmin, ValidUuid};
use crate::http::server::AppState;
use crate::models::catalog::{description, location, opening_hours};
use crate::models::{CanteenName, Paginated, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct CreateCanteenRequest {
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCanteenRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub is_open: Option<bool>,
}

impl UpdateCanteenRequest {
    fn validate(&self) -> Result<CanteenPatch, ApiError> {
        Ok(CanteenPatch {
            name: self.name.as_deref().map(CanteenName::new).transpose()?,
            location: location(self.location.as_deref())?,
            description: description(self.description.as_deref())?,
            hours: opening_hours(self.opens_at, self.closes_at)?,
            is_open: self.is_open,
        })
    }
}

/// GET /canteens
async fn list_canteens(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<CanteenWithRating>>, ApiError> {
    let canteens = CanteenRepo::new(&state.pool).list(params.into()).await?;
    Ok(Json(canteens))
}

/// GET /canteens/{id}
async fn get_canteen(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<CanteenWithRating>, ApiError> {
    let canteen = CanteenRepo::new(&state.pool).get(id).await?;
    Ok(Json(canteen))
}

/// POST /canteens
async fn create_canteen(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<CreateCanteenRequest>,
) -> Result<(StatusCode, Json<Canteen>), ApiError> {
    let new = NewCanteen {
        name: CanteenName::new(&req.name)?,
        location: location(req.location.as_deref())?,
        description: description(req.description.as_deref())?,
        hours: opening_hours(req.opens_at, req.closes_at)?,
    };

    let canteen = CanteenRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(canteen)))
}

/// PATCH /canteens/{id}
async fn update_canteen(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateCanteenRequest>,
) -> Result<Json<Canteen>, ApiError> {
    actor.ensure_manages(id)?;
    let patch = req.validate()?;
    let canteen = CanteenRepo::new(&state.pool).update(id, patch).await?;
    Ok(Json(canteen))
}

/// DELETE /canteens/{id}
async fn delete_canteen(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    CanteenRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /canteens/{id}/image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    StaffOrAdmin(actor): StaffOrAdmin,
    ValidUuid(id): ValidUuid,
    multipart: Multipart,
) -> Result<Json<Canteen>, ApiError> {
    actor.ensure_manages(id)?;
    let repo = CanteenRepo::new(&state.pool);
    repo.get(id).await?;

    let file = upload::read_image(multipart, state.settings.max_image_bytes).await?;
    let image = upload::store(&state, file, "canteens").await?;
    let canteen = repo.set_image(id, &image.url).await?;

    Ok(Json(canteen))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/canteens", get(list_canteens).post(create_canteen))
        .route(
            "/canteens/{id}",
            get(get_canteen).patch(update_canteen).delete(delete_canteen),
        )
        .route("/canteens/{id}/image", post(upload_image))
}
