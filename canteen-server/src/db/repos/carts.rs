//! Cart repository
//!
//! One cart per user, created on first write with `ON CONFLICT (user_id)`.
//! A cart holds items from a single canteen; `carts.canteen_id` tracks it
//! and is cleared whenever the cart empties.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::DbError;
use crate::models::{Quantity, ValidationError};

use super::menu::MenuItem;

/// Cart line joined with the live menu item
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub price_paise: i64,
    pub quantity: i32,
    pub is_available: bool,
    pub line_total_paise: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub canteen_id: Option<Uuid>,
    pub items: Vec<CartLine>,
    pub subtotal_paise: i64,
}

impl CartView {
    fn new(canteen_id: Option<Uuid>, items: Vec<CartLine>) -> Self {
        let subtotal_paise = items.iter().map(|l| l.line_total_paise).sum();
        Self {
            canteen_id,
            items,
            subtotal_paise,
        }
    }
}

pub struct CartRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current cart contents. A user without a cart gets an empty view.
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, DbError> {
        let cart: Option<(Uuid, Option<Uuid>)> =
            sqlx::query_as("SELECT id, canteen_id FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        let Some((cart_id, canteen_id)) = cart else {
            return Ok(CartView::new(None, Vec::new()));
        };

        let items = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT ci.menu_item_id, m.name, m.price_paise, ci.quantity, m.is_available,
                   m.price_paise * ci.quantity AS line_total_paise
            FROM cart_items ci
            JOIN menu_items m ON m.id = ci.menu_item_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at
            "#,
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(CartView::new(canteen_id, items))
    }

    /// Add `quantity` of `item`, accumulating onto an existing line.
    ///
    /// Fails with `InvalidState` if the cart holds another canteen's items
    /// and with `Invalid` if the accumulated quantity exceeds `max`.
    pub async fn add_item(
        &self,
        user_id: Uuid,
        item: &MenuItem,
        quantity: Quantity,
        max: i32,
    ) -> Result<CartView, DbError> {
        let mut tx = self.pool.begin().await?;

        // Upsert takes the row lock for the rest of the transaction
        let (cart_id, bound_canteen): (Uuid, Option<Uuid>) = sqlx::query_as(
            r#"
            INSERT INTO carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id, canteen_id
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let (lines,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_one(&mut *tx)
            .await?;

        if lines > 0 && bound_canteen != Some(item.canteen_id) {
            return Err(DbError::invalid_state(
                "cart holds items from another canteen; clear it first",
            ));
        }

        if bound_canteen != Some(item.canteen_id) {
            sqlx::query("UPDATE carts SET canteen_id = $2 WHERE id = $1")
                .bind(cart_id)
                .bind(item.canteen_id)
                .execute(&mut *tx)
                .await?;
        }

        let (total,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO cart_items (cart_id, menu_item_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, menu_item_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(cart_id)
        .bind(item.id)
        .bind(quantity.get())
        .fetch_one(&mut *tx)
        .await?;

        if total > max {
            return Err(ValidationError::OutOfRange {
                field: "quantity",
                min: 1,
                max: max as i64,
            }
            .into());
        }

        tx.commit().await?;
        self.view(user_id).await
    }

    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        menu_item_id: Uuid,
        quantity: Quantity,
    ) -> Result<CartView, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3
            WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)
              AND menu_item_id = $2
            "#,
        )
        .bind(user_id)
        .bind(menu_item_id)
        .bind(quantity.get())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("cart item", menu_item_id));
        }
        self.view(user_id).await
    }

    pub async fn remove_item(&self, user_id: Uuid, menu_item_id: Uuid) -> Result<CartView, DbError> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            DELETE FROM cart_items
            WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)
              AND menu_item_id = $2
            RETURNING cart_id
            "#,
        )
        .bind(user_id)
        .bind(menu_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((cart_id,)) = removed else {
            return Err(DbError::not_found("cart item", menu_item_id));
        };

        sqlx::query(
            r#"
            UPDATE carts SET canteen_id = NULL, updated_at = NOW()
            WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM cart_items WHERE cart_id = $1)
            "#,
        )
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.view(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE carts SET canteen_id = NULL, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
