//! Profile endpoints for the signed-in user

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::db::{ProfilePatch, User, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::RequireUser;
use crate::http::server::AppState;
use crate::models::{Password, PersonName, Phone, UniversityId};

/// Public view of a user; never carries the password hash
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            university_id: u.university_id,
            phone: u.phone,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub university_id: Option<String>,
    pub phone: Option<String>,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<ProfilePatch, ApiError> {
        Ok(ProfilePatch {
            name: self.name.as_deref().map(PersonName::new).transpose()?,
            university_id: self.university_id.as_deref().map(UniversityId::new).transpose()?,
            phone: self.phone.as_deref().map(Phone::new).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /users/me
async fn me(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).get(user_id).await?;
    Ok(Json(user.into()))
}

/// PATCH /users/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = req.validate()?;
    let user = UserRepo::new(&state.pool).update_profile(user_id, patch).await?;
    Ok(Json(user.into()))
}

/// PUT /users/me/password
async fn change_password(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let new_password = Password::new(&req.new_password)?;
    let repo = UserRepo::new(&state.pool);
    let user = repo.get(user_id).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized {
            message: "current password is incorrect",
        });
    }

    let hash = hash_password(&new_password)?;
    repo.update_password(user_id, &hash).await?;
    tracing::info!(user_id = %user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /users/me
async fn delete_me(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
) -> Result<StatusCode, ApiError> {
    UserRepo::new(&state.pool).delete_cascade(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(me).patch(update_me).delete(delete_me))
        .route("/users/me/password", put(change_password))
}
