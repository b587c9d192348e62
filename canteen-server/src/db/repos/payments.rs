//! Payment repository
//!
//! One payment row per order. Capture flips the payment and its order in
//! one transaction and is idempotent, since the checkout callback and the
//! gateway webhook both report the same capture.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{Paginated, Pagination, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, order_id, gateway_order_id, gateway_payment_id, amount_paise, \
     currency, status, refund_id, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount_paise: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PaymentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        amount_paise: i64,
        currency: &str,
    ) -> Result<Payment, DbError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (order_id, gateway_order_id, amount_paise, currency, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(gateway_order_id)
        .bind(amount_paise)
        .bind(currency)
        .bind(PaymentStatus::Created.as_str())
        .fetch_one(self.pool)
        .await?;

        tracing::info!(order_id = %order_id, gateway_order_id, "payment created");
        Ok(payment)
    }

    pub async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Payment>, DbError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Payment, DbError> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("payment", gateway_order_id))
    }

    /// Replace a failed attempt with a fresh gateway order.
    pub async fn reopen(
        &self,
        id: Uuid,
        gateway_order_id: &str,
        amount_paise: i64,
    ) -> Result<Payment, DbError> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET
                gateway_order_id = $2,
                gateway_payment_id = NULL,
                amount_paise = $3,
                status = 'created',
                updated_at = NOW()
            WHERE id = $1 AND status = 'failed'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(gateway_order_id)
        .bind(amount_paise)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::invalid_state("payment is not in a retryable state"))
    }

    /// Mark the payment captured and confirm its order, atomically.
    ///
    /// A payment that is already captured is returned unchanged.
    pub async fn capture(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Payment, DbError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_order_id = $1 FOR UPDATE"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("payment", gateway_order_id))?;

        match current.status {
            PaymentStatus::Captured => return Ok(current),
            PaymentStatus::Refunded => {
                return Err(DbError::invalid_state("payment has already been refunded"))
            }
            PaymentStatus::Failed => {
                return Err(DbError::invalid_state(
                    "payment attempt failed; start a new payment",
                ))
            }
            PaymentStatus::Created => {}
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET status = 'captured', gateway_payment_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(current.id)
        .bind(gateway_payment_id)
        .fetch_one(&mut *tx)
        .await?;

        let confirmed = sqlx::query(
            r#"
            UPDATE orders SET status = 'confirmed', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment.order_id)
        .execute(&mut *tx)
        .await?;

        if confirmed.rows_affected() == 0 {
            // Cancelled while the user was at checkout; callers refund it
            tracing::warn!(order_id = %payment.order_id, "captured payment for non-pending order");
        }

        tx.commit().await?;
        tracing::info!(
            order_id = %payment.order_id,
            gateway_payment_id,
            "payment captured"
        );
        Ok(payment)
    }

    /// Mark a not-yet-captured payment as failed. Returns `None` when the
    /// payment had already moved on.
    pub async fn mark_failed(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<Payment>, DbError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET
                status = 'failed',
                gateway_payment_id = COALESCE($2, gateway_payment_id),
                updated_at = NOW()
            WHERE gateway_order_id = $1 AND status = 'created'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .fetch_optional(self.pool)
        .await?;

        if payment.is_some() {
            tracing::warn!(gateway_order_id, "payment failed");
        }
        Ok(payment)
    }

    pub async fn mark_refunded(&self, id: Uuid, refund_id: &str) -> Result<Payment, DbError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET status = 'refunded', refund_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'captured'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(refund_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::invalid_state("payment is not captured"))?;

        tracing::info!(order_id = %payment.order_id, refund_id, "payment refunded");
        Ok(payment)
    }

    /// All payments, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<Payment>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}, COUNT(*) OVER() AS total
            FROM payments
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = page_total(self.pool, &rows, page, sqlx::query_scalar("SELECT COUNT(*) FROM payments")).await?;
        let items = rows
            .iter()
            .map(Payment::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    // Integration tests - run with DATABASE_URL set
    // cargo test -p canteen-server -- --ignored

    async fn checkout(pool: &PgPool) -> Payment {
        let (_, order) = fixtures::placed_order(pool, 4_500, 2).await;
        PaymentRepo::new(pool)
            .create(order.id, &format!("order_{}", fixtures::suffix()), order.total_paise, "INR")
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn capture_is_idempotent_and_confirms_order() {
        let pool = fixtures::database().await;
        let repo = PaymentRepo::new(&pool);
        let payment = checkout(&pool).await;

        let first = repo.capture(&payment.gateway_order_id, "pay_a").await.unwrap();
        assert_eq!(first.status, PaymentStatus::Captured);
        assert_eq!(first.gateway_payment_id.as_deref(), Some("pay_a"));

        // Webhook after the checkout callback reports the same capture
        let second = repo.capture(&payment.gateway_order_id, "pay_a").await.unwrap();
        assert_eq!(second.updated_at, first.updated_at);

        let order = crate::db::OrderRepo::new(&pool).get(payment.order_id).await.unwrap();
        assert_eq!(order.status, crate::models::OrderStatus::Confirmed);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn failed_and_refunded_payments_cannot_be_captured() {
        let pool = fixtures::database().await;
        let repo = PaymentRepo::new(&pool);

        let failed = checkout(&pool).await;
        let marked = repo.mark_failed(&failed.gateway_order_id, Some("pay_f")).await.unwrap();
        assert_eq!(marked.map(|p| p.status), Some(PaymentStatus::Failed));
        let err = repo.capture(&failed.gateway_order_id, "pay_f").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));

        let refunded = checkout(&pool).await;
        let captured = repo.capture(&refunded.gateway_order_id, "pay_r").await.unwrap();
        repo.mark_refunded(captured.id, "rfnd_1").await.unwrap();
        let err = repo.capture(&refunded.gateway_order_id, "pay_r").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState(ref m) if m.contains("refunded")));

        // A captured payment is never downgraded to failed
        assert!(repo.mark_failed(&refunded.gateway_order_id, None).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn reopen_replaces_failed_attempt_only() {
        let pool = fixtures::database().await;
        let repo = PaymentRepo::new(&pool);
        let payment = checkout(&pool).await;

        let err = repo.reopen(payment.id, "order_retry", 9_000).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));

        repo.mark_failed(&payment.gateway_order_id, Some("pay_x")).await.unwrap();
        let fresh = format!("order_{}", fixtures::suffix());
        let reopened = repo.reopen(payment.id, &fresh, 9_000).await.unwrap();
        assert_eq!(reopened.status, PaymentStatus::Created);
        assert_eq!(reopened.gateway_order_id, fresh);
        assert!(reopened.gateway_payment_id.is_none());

        assert!(matches!(
            repo.find_by_gateway_order(&payment.gateway_order_id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn page_past_the_end_keeps_total() {
        let pool = fixtures::database().await;
        checkout(&pool).await;

        let page = PaymentRepo::new(&pool)
            .list(Pagination::new(100_000, 1))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.total >= 1);
    }
}
