//! Custom Axum extractors
//!
//! Authentication is done by extractors rather than middleware: a handler
//! states who may call it by the extractor it takes.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::Claims;
use crate::db::StaffRepo;
use crate::models::{Role, ValidationError};

/// Verified bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized {
                message: "missing bearer token",
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized {
                message: "missing bearer token",
            })?;

        let claims = state.tokens.verify(token)?;
        Ok(Self(claims))
    }
}

/// Authenticated caller with staff accounts resolved to their canteen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User { id: Uuid },
    Staff { id: Uuid, canteen_id: Uuid },
    Admin { id: Uuid },
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match *self {
            Self::User { id } | Self::Staff { id, .. } | Self::Admin { id } => id,
        }
    }

    /// Admins manage every canteen, staff only their own.
    pub fn can_manage(&self, canteen_id: Uuid) -> bool {
        match *self {
            Self::Admin { .. } => true,
            Self::Staff { canteen_id: own, .. } => own == canteen_id,
            Self::User { .. } => false,
        }
    }

    pub fn ensure_manages(&self, canteen_id: Uuid) -> Result<(), ApiError> {
        if self.can_manage(canteen_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("not permitted to manage this canteen"))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        match claims.role {
            Role::User => Ok(Self::User { id: claims.sub }),
            Role::Admin => Ok(Self::Admin { id: claims.sub }),
            Role::Staff => {
                let canteen_id = StaffRepo::new(&state.pool)
                    .canteen_of(claims.sub)
                    .await?
                    .ok_or(ApiError::Unauthorized {
                        message: "account no longer exists",
                    })?;
                Ok(Self::Staff {
                    id: claims.sub,
                    canteen_id,
                })
            }
        }
    }
}

/// Caller must hold a user token
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Uuid);

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        match claims.role {
            Role::User => Ok(Self(claims.sub)),
            _ => Err(ApiError::forbidden("user account required")),
        }
    }
}

/// Caller must hold an admin token
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Uuid);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        match claims.role {
            Role::Admin => Ok(Self(claims.sub)),
            _ => Err(ApiError::forbidden("admin account required")),
        }
    }
}

/// Caller must be staff or admin; the canteen check is left to the handler
/// since the canteen is often only known after loading a row.
#[derive(Debug, Clone, Copy)]
pub struct StaffOrAdmin(pub Actor);

impl FromRequestParts<Arc<AppState>> for StaffOrAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Reject users before the staff lookup touches the database
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if claims.role == Role::User {
            return Err(ApiError::forbidden("staff or admin account required"));
        }
        let actor = Actor::from_request_parts(parts, state).await?;
        Ok(Self(actor))
    }
}

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "invalid UUID format",
            })
        })?;

        Ok(Self(uuid))
    }
}
