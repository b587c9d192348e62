//! Registration and login for users, staff and admins
//!
//! Login failures return the same 401 whether the email is unknown or the
//! password is wrong.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserResponse;
use crate::auth::{hash_password, verify_password};
use crate::db::{AdminRepo, NewUser, StaffRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::{Email, Password, PersonName, Phone, Role, UniversityId};

const BAD_CREDENTIALS: ApiError = ApiError::Unauthorized {
    message: "invalid email or password",
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub university_id: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Staff or admin identity returned on login
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canteen_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse<T> {
    pub token: String,
    pub user: T,
}

/// POST /auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse<UserResponse>>), ApiError> {
    let name = PersonName::new(&req.name)?;
    let email = Email::new(&req.email)?;
    let password = Password::new(&req.password)?;
    let university_id = req.university_id.as_deref().map(UniversityId::new).transpose()?;
    let phone = req.phone.as_deref().map(Phone::new).transpose()?;

    let password_hash = hash_password(&password)?;
    let user = UserRepo::new(&state.pool)
        .create(NewUser {
            name,
            email,
            password_hash,
            university_id,
            phone,
        })
        .await?;

    let token = state.tokens.issue(user.id, Role::User)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse<UserResponse>>, ApiError> {
    let email = Email::new(&req.email).map_err(|_| BAD_CREDENTIALS)?;
    let user = UserRepo::new(&state.pool)
        .find_by_email(&email)
        .await?
        .ok_or(BAD_CREDENTIALS)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(BAD_CREDENTIALS);
    }

    let token = state.tokens.issue(user.id, Role::User)?;
    Ok(Json(TokenResponse {
        token,
        user: user.into(),
    }))
}

/// POST /staff/auth/login
async fn staff_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse<AccountResponse>>, ApiError> {
    let email = Email::new(&req.email).map_err(|_| BAD_CREDENTIALS)?;
    let staff = StaffRepo::new(&state.pool)
        .find_by_email(&email)
        .await?
        .ok_or(BAD_CREDENTIALS)?;

    if !verify_password(&req.password, &staff.password_hash)? {
        return Err(BAD_CREDENTIALS);
    }

    let token = state.tokens.issue(staff.id, Role::Staff)?;
    Ok(Json(TokenResponse {
        token,
        user: AccountResponse {
            id: staff.id,
            name: staff.name,
            email: staff.email,
            role: Role::Staff,
            canteen_id: Some(staff.canteen_id),
        },
    }))
}

/// POST /admin/auth/login
async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse<AccountResponse>>, ApiError> {
    let email = Email::new(&req.email).map_err(|_| BAD_CREDENTIALS)?;
    let admin = AdminRepo::new(&state.pool)
        .find_by_email(&email)
        .await?
        .ok_or(BAD_CREDENTIALS)?;

    if !verify_password(&req.password, &admin.password_hash)? {
        return Err(BAD_CREDENTIALS);
    }

    let token = state.tokens.issue(admin.id, Role::Admin)?;
    Ok(Json(TokenResponse {
        token,
        user: AccountResponse {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: Role::Admin,
            canteen_id: None,
        },
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/staff/auth/login", post(staff_login))
        .route("/admin/auth/login", post(admin_login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, json_request, send};
    use serde_json::json;

    #[tokio::test]
    async fn register_rejects_bad_email() {
        let req = json_request(
            "POST",
            "/auth/register",
            None,
            json!({"name": "Meera", "email": "not-an-email", "password": "longenough"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let req = json_request(
            "POST",
            "/auth/register",
            None,
            json!({"name": "Meera", "email": "meera@campus.edu", "password": "abc"}),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_login_email_is_401_not_400() {
        let req = json_request(
            "POST",
            "/auth/login",
            None,
            json!({"email": "nope", "password": "whatever1"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid email or password");
    }

    #[test]
    fn account_response_omits_missing_canteen() {
        let account = AccountResponse {
            id: Uuid::nil(),
            name: "Root".into(),
            email: "root@campus.edu".into(),
            role: Role::Admin,
            canteen_id: None,
        };
        let value = serde_json::to_value(account).unwrap();
        assert_eq!(value["role"], "admin");
        assert!(value.get("canteen_id").is_none());
    }
}
