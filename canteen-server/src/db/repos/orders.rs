//! Order repository
//!
//! Placement turns the user's cart into an order in one transaction:
//! the cart row is locked, lines are checked against the live menu,
//! names and prices are snapshotted into `items`, and the cart is emptied.
//! Status changes are compare-and-set on the current status so two staff
//! members cannot both move the same order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{OrderStatus, Paginated, Pagination, ValidationError};

const ORDER_COLUMNS: &str = "id, user_id, canteen_id, items, subtotal_paise, is_priority, \
     priority_fee_paise, total_paise, status, exam_id, created_at, updated_at";

/// Menu item as it was when the order was placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub price_paise: i64,
    pub quantity: i32,
    pub line_total_paise: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub canteen_id: Uuid,
    #[sqlx(json)]
    pub items: Vec<OrderLine>,
    pub subtotal_paise: i64,
    pub is_priority: bool,
    pub priority_fee_paise: i64,
    pub total_paise: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub exam_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fee and qualifying exam for a priority order
#[derive(Debug, Clone, Copy)]
pub struct PriorityCharge {
    pub fee_paise: i64,
    pub exam_id: Uuid,
}

#[derive(Debug, FromRow)]
struct PendingLine {
    menu_item_id: Uuid,
    name: String,
    price_paise: i64,
    quantity: i32,
    is_available: bool,
    canteen_id: Uuid,
}

impl From<&PendingLine> for OrderLine {
    fn from(line: &PendingLine) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            name: line.name.clone(),
            price_paise: line.price_paise,
            quantity: line.quantity,
            line_total_paise: line.price_paise * line.quantity as i64,
        }
    }
}

pub struct OrderRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the user's cart.
    ///
    /// Errors:
    /// - `Invalid` when the cart is empty
    /// - `InvalidState` when the canteen is closed or an item is unavailable
    pub async fn place(
        &self,
        user_id: Uuid,
        priority: Option<PriorityCharge>,
    ) -> Result<Order, DbError> {
        let mut tx = self.pool.begin().await?;

        let cart: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((cart_id,)) = cart else {
            return Err(ValidationError::Empty { field: "cart" }.into());
        };

        let lines = sqlx::query_as::<_, PendingLine>(
            r#"
            SELECT ci.menu_item_id, m.name, m.price_paise, ci.quantity,
                   m.is_available, m.canteen_id
            FROM cart_items ci
            JOIN menu_items m ON m.id = ci.menu_item_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at
            "#,
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;

        let Some(first) = lines.first() else {
            return Err(ValidationError::Empty { field: "cart" }.into());
        };
        let canteen_id = first.canteen_id;

        let (canteen_name, is_open): (String, bool) =
            sqlx::query_as("SELECT name, is_open FROM canteens WHERE id = $1")
                .bind(canteen_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("canteen", canteen_id))?;

        if !is_open {
            return Err(DbError::invalid_state(format!(
                "{canteen_name} is not accepting orders right now"
            )));
        }

        if let Some(gone) = lines.iter().find(|l| !l.is_available) {
            return Err(DbError::invalid_state(format!(
                "{} is no longer available",
                gone.name
            )));
        }

        let items: Vec<OrderLine> = lines.iter().map(OrderLine::from).collect();
        let subtotal: i64 = items.iter().map(|l| l.line_total_paise).sum();
        let fee = priority.map(|p| p.fee_paise).unwrap_or(0);

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (user_id, canteen_id, items, subtotal_paise, is_priority,
                 priority_fee_paise, total_paise, status, exam_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(canteen_id)
        .bind(Json(&items))
        .bind(subtotal)
        .bind(priority.is_some())
        .bind(fee)
        .bind(subtotal + fee)
        .bind(OrderStatus::Pending.as_str())
        .bind(priority.map(|p| p.exam_id))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE carts SET canteen_id = NULL, updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            canteen_id = %order.canteen_id,
            priority = order.is_priority,
            total_paise = order.total_paise,
            "order placed"
        );
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, DbError> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("order", id))
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<Paginated<Order>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}, COUNT(*) OVER() AS total
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1").bind(user_id);
        let total = page_total(self.pool, &rows, page, count).await?;
        collect_page(rows, page, total)
    }

    /// Kitchen queue: priority orders first, then oldest first.
    pub async fn queue(
        &self,
        canteen_id: Uuid,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<Paginated<Order>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}, COUNT(*) OVER() AS total
            FROM orders
            WHERE canteen_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY is_priority DESC, created_at ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(canteen_id)
        .bind(status.map(OrderStatus::as_str))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE canteen_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(canteen_id)
        .bind(status.map(OrderStatus::as_str));
        let total = page_total(self.pool, &rows, page, count).await?;
        collect_page(rows, page, total)
    }

    /// Move an order from `from` to `to`. Fails with `InvalidState` if the
    /// order is no longer in `from`.
    pub async fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, DbError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::invalid_state(format!("order is no longer {from}")))?;

        tracing::info!(order_id = %id, %from, %to, "order status changed");
        Ok(order)
    }
}

fn collect_page(
    rows: Vec<sqlx::postgres::PgRow>,
    page: Pagination,
    total: i64,
) -> Result<Paginated<Order>, DbError> {
    let items = rows
        .iter()
        .map(Order::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(page.wrap(items, total))
}
