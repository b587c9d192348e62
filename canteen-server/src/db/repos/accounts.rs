//! Admin and canteen staff accounts

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{Email, Paginated, Pagination, PersonName};

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Staff belong to exactly one canteen and can only act on it.
#[derive(Debug, Clone, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub canteen_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub struct AdminRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &PersonName,
        email: &Email,
        password_hash: &str,
    ) -> Result<Admin, DbError> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await?;

        Ok(admin)
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Admin>, DbError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, name, email, password_hash, created_at FROM admins WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(admin)
    }
}

pub struct StaffRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> StaffRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// An unknown `canteen_id` is rejected by the foreign key.
    pub async fn create(
        &self,
        name: &PersonName,
        email: &Email,
        password_hash: &str,
        canteen_id: Uuid,
    ) -> Result<Staff, DbError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO canteen_staff (name, email, password_hash, canteen_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, canteen_id, created_at
            "#,
        )
        .bind(name.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .bind(canteen_id)
        .fetch_one(self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Staff>, DbError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT id, name, email, password_hash, canteen_id, created_at
            FROM canteen_staff WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(staff)
    }

    /// Canteen a staff member works at; `None` once the account is gone.
    pub async fn canteen_of(&self, staff_id: Uuid) -> Result<Option<Uuid>, DbError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT canteen_id FROM canteen_staff WHERE id = $1")
                .bind(staff_id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(canteen_id,)| canteen_id))
    }

    pub async fn list(
        &self,
        canteen_id: Option<Uuid>,
        page: Pagination,
    ) -> Result<Paginated<Staff>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, canteen_id, created_at,
                   COUNT(*) OVER() AS total
            FROM canteen_staff
            WHERE ($1::uuid IS NULL OR canteen_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(canteen_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = page_total(self.pool, &rows, page, sqlx::query_scalar(
                "SELECT COUNT(*) FROM canteen_staff WHERE ($1::uuid IS NULL OR canteen_id = $1)",
            )
            .bind(canteen_id)).await?;
        let items = rows
            .iter()
            .map(Staff::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM canteen_staff WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("staff", id));
        }
        Ok(())
    }
}
