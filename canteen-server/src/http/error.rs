//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::models::ValidationError;
use crate::payments::GatewayError;
use crate::storage::ImageError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request is well-formed but unusable (400)
    BadRequest { message: String },

    /// Missing or bad credentials (401)
    Unauthorized { message: &'static str },

    /// Authenticated but not allowed (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// State or uniqueness conflict (409)
    Conflict { message: String },

    /// Upload over the configured limit (413)
    PayloadTooLarge { limit: usize },

    /// Database error (500, logged)
    Database(DbError),

    /// Payment gateway or image store failed (502, logged)
    Upstream { service: &'static str, message: String },

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, "bad_request", message),
            Self::Unauthorized { message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message.to_owned())
            }
            Self::Forbidden { reason } => (StatusCode::FORBIDDEN, "forbidden", reason),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} '{}' not found", resource, id),
            ),
            Self::Conflict { message } => (StatusCode::CONFLICT, "conflict", message),
            Self::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                format!("upload exceeds {} bytes", limit),
            ),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_owned(),
                )
            }
            Self::Upstream { service, message } => {
                tracing::error!(service, "Upstream error: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    format!("{} is unavailable, try again later", service),
                )
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_owned(),
                )
            }
        };

        let body = json!({
            "error": code,
            "message": message
        });

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { constraint } => Self::Conflict {
                message: conflict_message(&constraint).to_owned(),
            },
            DbError::InvalidState(message) => Self::Conflict { message },
            DbError::Invalid(e) => Self::Validation(e),
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Token(_) => Self::Unauthorized {
                message: "invalid or expired token",
            },
            AuthError::Hash(message) => Self::Internal { message },
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self::Upstream {
            service: "payment gateway",
            message: e.to_string(),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        Self::Upstream {
            service: "image store",
            message: e.to_string(),
        }
    }
}

/// User-facing text for the constraints declared in migrations
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "users_email_key" | "admins_email_key" | "canteen_staff_email_key" => {
            "email is already registered"
        }
        "users_university_id_key" => "university ID is already registered",
        "canteens_name_key" => "a canteen with this name already exists",
        "menu_items_canteen_name_key" => "this canteen already has an item with that name",
        "feedback_order_user_key" => "feedback for this order was already submitted",
        "payments_order_id_key" => "a payment already exists for this order",
        "orders_canteen_id_fkey" | "feedback_canteen_id_fkey" => {
            "canteen has order history and cannot be deleted"
        }
        "canteen_staff_canteen_id_fkey" => "canteen does not exist",
        _ => "resource already exists",
    }
}
