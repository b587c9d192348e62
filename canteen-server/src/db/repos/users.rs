//! User repository
//!
//! Deleting a user removes everything that references them in one
//! transaction, children first.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::repos::page_total;
use crate::db::DbError;
use crate::models::{Email, Paginated, Pagination, PersonName, Phone, UniversityId};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, university_id, phone, created_at, updated_at";

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub university_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Parsed university ID, if one is on file and still well-formed.
    pub fn university_id(&self) -> Option<UniversityId> {
        self.university_id
            .as_deref()
            .and_then(|raw| UniversityId::new(raw).ok())
    }
}

/// Validated registration input
#[derive(Debug)]
pub struct NewUser {
    pub name: PersonName,
    pub email: Email,
    pub password_hash: String,
    pub university_id: Option<UniversityId>,
    pub phone: Option<Phone>,
}

/// Fields a user may change on their profile; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub name: Option<PersonName>,
    pub university_id: Option<UniversityId>,
    pub phone: Option<Phone>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user. Duplicate email or university ID surfaces as
    /// `DbError::Conflict` from the unique index.
    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, university_id, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.name.as_str())
        .bind(new.email.as_str())
        .bind(&new.password_hash)
        .bind(new.university_id.as_ref().map(UniversityId::as_str))
        .bind(new.phone.as_ref().map(Phone::as_str))
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                university_id = COALESCE($3, university_id),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_ref().map(PersonName::as_str))
        .bind(patch.university_id.as_ref().map(UniversityId::as_str))
        .bind(patch.phone.as_ref().map(Phone::as_str))
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    /// List users, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<User>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = page_total(self.pool, &rows, page, sqlx::query_scalar("SELECT COUNT(*) FROM users")).await?;
        let items = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Delete a user and all their data atomically.
    pub async fn delete_cascade(&self, id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM feedback WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM payments WHERE order_id IN (SELECT id FROM orders WHERE user_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM orders WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // cart_items cascade from carts
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            // Dropping tx rolls back
            return Err(DbError::not_found("user", id));
        }

        tx.commit().await?;
        tracing::info!(user_id = %id, "user deleted with cascade");
        Ok(())
    }
}
