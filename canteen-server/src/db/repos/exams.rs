//! Exam schedule repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::DbError;
use crate::models::ExamRange;

const EXAM_COLUMNS: &str =
    "id, name, id_prefix, roll_start, roll_end, starts_on, ends_on, created_at";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: Uuid,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub range: ExamRange,
    pub created_at: DateTime<Utc>,
}

impl AsRef<ExamRange> for Exam {
    fn as_ref(&self) -> &ExamRange {
        &self.range
    }
}

pub struct ExamRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ExamRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, range: &ExamRange) -> Result<Exam, DbError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            r#"
            INSERT INTO exam_details (name, id_prefix, roll_start, roll_end, starts_on, ends_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(&range.id_prefix)
        .bind(range.roll_start)
        .bind(range.roll_end)
        .bind(range.starts_on)
        .bind(range.ends_on)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(exam_id = %exam.id, prefix = %range.id_prefix, "exam scheduled");
        Ok(exam)
    }

    /// All exams, soonest first.
    pub async fn list(&self) -> Result<Vec<Exam>, DbError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exam_details ORDER BY starts_on, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(exams)
    }

    /// Exams whose window contains `day`, oldest-created first so
    /// eligibility checks pick a stable exam.
    pub async fn active_on(&self, day: NaiveDate) -> Result<Vec<Exam>, DbError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            r#"
            SELECT {EXAM_COLUMNS} FROM exam_details
            WHERE starts_on <= $1 AND ends_on >= $1
            ORDER BY created_at, id
            "#
        ))
        .bind(day)
        .fetch_all(self.pool)
        .await?;

        Ok(exams)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM exam_details WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("exam", id));
        }
        Ok(())
    }
}
