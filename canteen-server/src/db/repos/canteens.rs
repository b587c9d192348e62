//! Canteen repository
//!
//! Listings carry the rating summary from a LEFT JOIN on feedback so the
//! directory page needs one query.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{CanteenName, Paginated, Pagination};

const CANTEEN_COLUMNS: &str = "c.id, c.name, c.location, c.description, c.image_url, \
     c.opens_at, c.closes_at, c.is_open, c.created_at, c.updated_at";

/// Canteen record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Canteen {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canteen with its feedback summary
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CanteenWithRating {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub canteen: Canteen,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

#[derive(Debug)]
pub struct NewCanteen {
    pub name: CanteenName,
    pub location: Option<String>,
    pub description: Option<String>,
    pub hours: Option<(NaiveTime, NaiveTime)>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct CanteenPatch {
    pub name: Option<CanteenName>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub hours: Option<(NaiveTime, NaiveTime)>,
    pub is_open: Option<bool>,
}

pub struct CanteenRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CanteenRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewCanteen) -> Result<Canteen, DbError> {
        let canteen = sqlx::query_as::<_, Canteen>(&format!(
            r#"
            INSERT INTO canteens AS c (name, location, description, opens_at, closes_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CANTEEN_COLUMNS}
            "#
        ))
        .bind(new.name.as_str())
        .bind(&new.location)
        .bind(&new.description)
        .bind(new.hours.map(|(open, _)| open))
        .bind(new.hours.map(|(_, close)| close))
        .fetch_one(self.pool)
        .await?;

        tracing::info!(canteen_id = %canteen.id, name = %canteen.name, "canteen created");
        Ok(canteen)
    }

    /// List canteens alphabetically with rating summaries.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<CanteenWithRating>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CANTEEN_COLUMNS},
                   AVG(f.rating)::float8 AS average_rating,
                   COUNT(f.id) AS rating_count,
                   COUNT(*) OVER() AS total
            FROM canteens c
            LEFT JOIN feedback f ON f.canteen_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = page_total(self.pool, &rows, page, sqlx::query_scalar("SELECT COUNT(*) FROM canteens")).await?;
        let items = rows
            .iter()
            .map(CanteenWithRating::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<CanteenWithRating, DbError> {
        sqlx::query_as::<_, CanteenWithRating>(&format!(
            r#"
            SELECT {CANTEEN_COLUMNS},
                   AVG(f.rating)::float8 AS average_rating,
                   COUNT(f.id) AS rating_count
            FROM canteens c
            LEFT JOIN feedback f ON f.canteen_id = c.id
            WHERE c.id = $1
            GROUP BY c.id
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("canteen", id))
    }

    pub async fn update(&self, id: Uuid, patch: CanteenPatch) -> Result<Canteen, DbError> {
        sqlx::query_as::<_, Canteen>(&format!(
            r#"
            UPDATE canteens AS c SET
                name = COALESCE($2, c.name),
                location = COALESCE($3, c.location),
                description = COALESCE($4, c.description),
                opens_at = COALESCE($5, c.opens_at),
                closes_at = COALESCE($6, c.closes_at),
                is_open = COALESCE($7, c.is_open),
                updated_at = NOW()
            WHERE c.id = $1
            RETURNING {CANTEEN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_ref().map(CanteenName::as_str))
        .bind(&patch.location)
        .bind(&patch.description)
        .bind(patch.hours.map(|(open, _)| open))
        .bind(patch.hours.map(|(_, close)| close))
        .bind(patch.is_open)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("canteen", id))
    }

    pub async fn set_image(&self, id: Uuid, url: &str) -> Result<Canteen, DbError> {
        sqlx::query_as::<_, Canteen>(&format!(
            r#"
            UPDATE canteens AS c SET image_url = $2, updated_at = NOW()
            WHERE c.id = $1
            RETURNING {CANTEEN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("canteen", id))
    }

    /// Staff and menu go with the canteen. Order history blocks deletion
    /// through the foreign key and surfaces as `DbError::Conflict`.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM canteens WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("canteen", id));
        }
        tracing::info!(canteen_id = %id, "canteen deleted");
        Ok(())
    }
}
