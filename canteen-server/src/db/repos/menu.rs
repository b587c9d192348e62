//! Menu item repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::DbError;
use crate::models::{Category, ItemName, Price};

const ITEM_COLUMNS: &str = "id, canteen_id, name, description, price_paise, category, \
     is_veg, is_available, image_url, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub canteen_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    pub category: String,
    pub is_veg: bool,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewMenuItem {
    pub name: ItemName,
    pub description: Option<String>,
    pub price: Price,
    pub category: Category,
    pub is_veg: bool,
    pub is_available: bool,
}

#[derive(Debug, Default)]
pub struct MenuItemPatch {
    pub name: Option<ItemName>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category: Option<Category>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
}

/// Menu listing filters
#[derive(Debug, Default)]
pub struct MenuFilter {
    pub category: Option<Category>,
    pub available_only: bool,
}

pub struct MenuRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, canteen_id: Uuid, new: NewMenuItem) -> Result<MenuItem, DbError> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            INSERT INTO menu_items
                (canteen_id, name, description, price_paise, category, is_veg, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(canteen_id)
        .bind(new.name.as_str())
        .bind(&new.description)
        .bind(new.price.paise())
        .bind(new.category.as_str())
        .bind(new.is_veg)
        .bind(new.is_available)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }

    /// Whole menu of one canteen, grouped by category then name.
    pub async fn list_for_canteen(
        &self,
        canteen_id: Uuid,
        filter: &MenuFilter,
    ) -> Result<Vec<MenuItem>, DbError> {
        let items = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM menu_items
            WHERE canteen_id = $1
              AND ($2::text IS NULL OR category = $2)
              AND (NOT $3 OR is_available)
            ORDER BY category, name
            "#
        ))
        .bind(canteen_id)
        .bind(filter.category.as_ref().map(Category::as_str))
        .bind(filter.available_only)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> Result<MenuItem, DbError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("menu item", id))
    }

    pub async fn update(&self, id: Uuid, patch: MenuItemPatch) -> Result<MenuItem, DbError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            UPDATE menu_items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_paise = COALESCE($4, price_paise),
                category = COALESCE($5, category),
                is_veg = COALESCE($6, is_veg),
                is_available = COALESCE($7, is_available),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_ref().map(ItemName::as_str))
        .bind(&patch.description)
        .bind(patch.price.map(Price::paise))
        .bind(patch.category.as_ref().map(Category::as_str))
        .bind(patch.is_veg)
        .bind(patch.is_available)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("menu item", id))
    }

    pub async fn set_image(&self, id: Uuid, url: &str) -> Result<MenuItem, DbError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            UPDATE menu_items SET image_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("menu item", id))
    }

    /// Past orders keep their item snapshot, so deletion is never blocked.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("menu item", id));
        }
        Ok(())
    }
}
