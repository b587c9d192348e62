//! Feedback repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{Paginated, Pagination, Rating};

const FEEDBACK_COLUMNS: &str =
    "f.id, f.order_id, f.user_id, f.canteen_id, f.rating, f.comment, f.created_at";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Feedback {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub canteen_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate rating for one canteen
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub count: i64,
}

pub struct FeedbackRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FeedbackRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A second submission for the same order hits `feedback_order_user_key`.
    pub async fn create(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        canteen_id: Uuid,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<Feedback, DbError> {
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            r#"
            INSERT INTO feedback AS f (order_id, user_id, canteen_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FEEDBACK_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(user_id)
        .bind(canteen_id)
        .bind(rating.get())
        .bind(comment)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(order_id = %order_id, rating = feedback.rating, "feedback recorded");
        Ok(feedback)
    }

    pub async fn list_for_canteen(
        &self,
        canteen_id: Uuid,
        page: Pagination,
    ) -> Result<Paginated<Feedback>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {FEEDBACK_COLUMNS}, COUNT(*) OVER() AS total
            FROM feedback f
            WHERE f.canteen_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(canteen_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE canteen_id = $1")
            .bind(canteen_id);
        let total = page_total(self.pool, &rows, page, count).await?;
        collect_page(rows, page, total)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<Paginated<Feedback>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {FEEDBACK_COLUMNS}, COUNT(*) OVER() AS total
            FROM feedback f
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE user_id = $1").bind(user_id);
        let total = page_total(self.pool, &rows, page, count).await?;
        collect_page(rows, page, total)
    }

    pub async fn summary(&self, canteen_id: Uuid) -> Result<RatingSummary, DbError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT AVG(rating)::float8 AS average_rating, COUNT(*) AS count
            FROM feedback
            WHERE canteen_id = $1
            "#,
        )
        .bind(canteen_id)
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }
}

fn collect_page(
    rows: Vec<sqlx::postgres::PgRow>,
    page: Pagination,
    total: i64,
) -> Result<Paginated<Feedback>, DbError> {
    let items = rows
        .iter()
        .map(Feedback::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(page.wrap(items, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, OrderRepo};
    use crate::models::OrderStatus;

    // Integration tests - run with DATABASE_URL set
    // cargo test -p canteen-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn one_feedback_per_order_and_summary() {
        let pool = fixtures::database().await;
        let (user, order) = fixtures::placed_order(&pool, 3_000, 1).await;
        OrderRepo::new(&pool)
            .transition(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap();
        let repo = FeedbackRepo::new(&pool);

        let rating = Rating::new(4).unwrap();
        repo.create(order.id, user.id, order.canteen_id, rating, Some("Crisp dosa".into()))
            .await
            .unwrap();
        let err = repo
            .create(order.id, user.id, order.canteen_id, Rating::new(1).unwrap(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref constraint } if constraint == "feedback_order_user_key"));

        let summary = repo.summary(order.canteen_id).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average_rating, Some(4.0));

        let mine = repo.list_for_user(user.id, Pagination::default()).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].comment.as_deref(), Some("Crisp dosa"));

        let past_end = repo
            .list_for_canteen(order.canteen_id, Pagination::new(3, 20))
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unrated_canteen_has_no_average() {
        let pool = fixtures::database().await;
        let canteen = fixtures::canteen(&pool).await;
        let summary = FeedbackRepo::new(&pool).summary(canteen.id).await.unwrap();
        assert_eq!(summary.count, 0);
        assert!(summary.average_rating.is_none());
    }
}
