//! Exam schedule and priority eligibility

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::{Exam, ExamRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{RequireAdmin, RequireUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::validation::bounded_text;
use crate::models::{check_eligibility, ExamRange, Ineligible};

const MAX_EXAM_NAME_LEN: usize = 120;

#[derive(Debug, Deserialize)]
pub struct CreateExamRequest {
    pub name: String,
    pub id_prefix: String,
    pub roll_start: i64,
    pub roll_end: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam: Option<Exam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligible>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EligibilityResponse {
    fn from_check(result: Result<&Exam, Ineligible>) -> Self {
        match result {
            Ok(exam) => Self {
                eligible: true,
                exam: Some(exam.clone()),
                reason: None,
                message: None,
            },
            Err(reason) => Self {
                eligible: false,
                exam: None,
                reason: Some(reason),
                message: Some(reason.to_string()),
            },
        }
    }
}

/// GET /exams
async fn list_exams(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Exam>>, ApiError> {
    Ok(Json(ExamRepo::new(&state.pool).list().await?))
}

/// POST /exams
async fn create_exam(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin_id): RequireAdmin,
    Json(req): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<Exam>), ApiError> {
    let name = bounded_text(&req.name, "name", MAX_EXAM_NAME_LEN)?;
    let range = ExamRange::new(
        &req.id_prefix,
        req.roll_start,
        req.roll_end,
        req.starts_on,
        req.ends_on,
    )?;

    let exam = ExamRepo::new(&state.pool).create(&name, &range).await?;
    tracing::info!(exam_id = %exam.id, by = %admin_id, "exam created");
    Ok((StatusCode::CREATED, Json(exam)))
}

/// DELETE /exams/{id}
async fn delete_exam(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    ExamRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /exams/active
async fn active_exams(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Exam>>, ApiError> {
    let today = Local::now().date_naive();
    Ok(Json(ExamRepo::new(&state.pool).active_on(today).await?))
}

/// GET /users/me/priority-eligibility
async fn eligibility(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).get(user_id).await?;
    let today = Local::now().date_naive();
    let exams = ExamRepo::new(&state.pool).active_on(today).await?;

    let university_id = user.university_id();
    let result = check_eligibility(university_id.as_ref(), &exams, today);
    Ok(Json(EligibilityResponse::from_check(result)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exams", get(list_exams).post(create_exam))
        .route("/exams/active", get(active_exams))
        .route("/exams/{id}", delete(delete_exam))
        .route("/users/me/priority-eligibility", get(eligibility))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{app, bearer, empty_request, json_request, send};
    use crate::models::Role;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn exam_body() -> serde_json::Value {
        json!({
            "name": "End semester",
            "id_prefix": "21BCE",
            "roll_start": 1,
            "roll_end": 200,
            "starts_on": "2026-11-02",
            "ends_on": "2026-11-20"
        })
    }

    #[tokio::test]
    async fn creating_exams_is_admin_only() {
        let auth = bearer(Role::User);
        let req = json_request("POST", "/exams", Some(&auth), exam_body());
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn inverted_window_is_400() {
        let auth = bearer(Role::Admin);
        let mut body = exam_body();
        body["starts_on"] = json!("2026-12-01");
        let (status, json) = send(app(), json_request("POST", "/exams", Some(&auth), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "starts_on must not be after ends_on");
    }

    #[tokio::test]
    async fn blank_exam_name_is_400() {
        let auth = bearer(Role::Admin);
        let mut body = exam_body();
        body["name"] = json!("   ");
        let (status, _) = send(app(), json_request("POST", "/exams", Some(&auth), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn eligibility_is_user_only() {
        let auth = bearer(Role::Staff);
        let req = empty_request("GET", "/users/me/priority-eligibility", Some(&auth));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn ineligible_response_carries_reason() {
        let value = serde_json::to_value(EligibilityResponse::from_check(Err(
            Ineligible::NoActiveExam,
        )))
        .unwrap();
        assert_eq!(value["eligible"], false);
        assert_eq!(value["reason"], "no_active_exam");
        assert_eq!(value["message"], "no exam is running today");
        assert!(value.get("exam").is_none());
    }

    #[test]
    fn eligible_response_embeds_exam() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let exam = Exam {
            id: Uuid::new_v4(),
            name: "Physics".into(),
            range: ExamRange::new("21BCE", 1, 50, day, day).unwrap(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(EligibilityResponse::from_check(Ok(&exam))).unwrap();
        assert_eq!(value["eligible"], true);
        assert_eq!(value["exam"]["id_prefix"], "21BCE");
        assert!(value.get("reason").is_none());
    }
}
