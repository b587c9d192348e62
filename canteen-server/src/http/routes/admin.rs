//! Admin management of users and staff accounts

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserResponse;
use crate::auth::hash_password;
use crate::db::{CanteenRepo, Staff, StaffRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireAdmin, ValidUuid};
use crate::http::server::AppState;
use crate::models::{Email, Paginated, Pagination, PaginationParams, Password, PersonName};

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub canteen_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    pub canteen_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StaffResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub canteen_id: Uuid,
    pub created_at: String,
}

impl From<Staff> for StaffResponse {
    fn from(s: Staff) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            canteen_id: s.canteen_id,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

/// GET /admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let users = UserRepo::new(&state.pool).list(params.into()).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// DELETE /admin/users/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin_id): RequireAdmin,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    UserRepo::new(&state.pool).delete_cascade(id).await?;
    tracing::info!(admin_id = %admin_id, user_id = %id, "user removed by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/staff
async fn create_staff(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<StaffResponse>), ApiError> {
    let name = PersonName::new(&req.name)?;
    let email = Email::new(&req.email)?;
    let password = Password::new(&req.password)?;

    // 404 for an unknown canteen rather than a bare FK conflict
    CanteenRepo::new(&state.pool).get(req.canteen_id).await?;

    let hash = hash_password(&password)?;
    let staff = StaffRepo::new(&state.pool)
        .create(&name, &email, &hash, req.canteen_id)
        .await?;

    tracing::info!(staff_id = %staff.id, canteen_id = %staff.canteen_id, "staff account created");
    Ok((StatusCode::CREATED, Json(staff.into())))
}

/// GET /admin/staff
async fn list_staff(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Paginated<StaffResponse>>, ApiError> {
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let staff = StaffRepo::new(&state.pool).list(query.canteen_id, page).await?;
    Ok(Json(staff.map(StaffResponse::from)))
}

/// DELETE /admin/staff/{id}
async fn delete_staff(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    StaffRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/staff", get(list_staff).post(create_staff))
        .route("/admin/staff/{id}", delete(delete_staff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, bearer, empty_request, json_request, send};
    use crate::models::Role;
    use serde_json::json;

    #[tokio::test]
    async fn user_token_cannot_list_users() {
        let auth = bearer(Role::User);
        let (status, body) = send(app(), empty_request("GET", "/admin/users", Some(&auth))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn delete_user_rejects_bad_uuid() {
        let auth = bearer(Role::Admin);
        let (status, _) = send(
            app(),
            empty_request("DELETE", "/admin/users/not-a-uuid", Some(&auth)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_staff_validates_before_lookup() {
        let auth = bearer(Role::Admin);
        let req = json_request(
            "POST",
            "/admin/staff",
            Some(&auth),
            json!({
                "name": "Kitchen Lead",
                "email": "lead@",
                "password": "longenough",
                "canteen_id": Uuid::new_v4(),
            }),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
