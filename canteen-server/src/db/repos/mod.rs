//! Repository implementations for database access
//!
//! Each repository borrows the pool and follows these patterns:
//! - JOINs and window counts for list operations (no N+1)
//! - Unique indexes reject duplicates (no check-then-insert)
//! - Transactions for multi-row writes

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryScalar;
use sqlx::{PgPool, Postgres, Row};

use crate::db::DbError;
use crate::models::Pagination;

pub mod accounts;
pub mod canteens;
pub mod carts;
pub mod exams;
pub mod feedback;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod users;

pub use accounts::{Admin, AdminRepo, Staff, StaffRepo};
pub use canteens::{Canteen, CanteenPatch, CanteenRepo, CanteenWithRating, NewCanteen};
pub use carts::{CartLine, CartRepo, CartView};
pub use exams::{Exam, ExamRepo};
pub use feedback::{Feedback, FeedbackRepo, RatingSummary};
pub use menu::{MenuFilter, MenuItem, MenuItemPatch, MenuRepo, NewMenuItem};
pub use orders::{Order, OrderLine, OrderRepo, PriorityCharge};
pub use payments::{Payment, PaymentRepo};
pub use users::{NewUser, ProfilePatch, User, UserRepo};

/// Total rows behind a page fetched with `COUNT(*) OVER()`.
///
/// A page past the end comes back without rows to carry the window count,
/// so `count` is run instead.
pub(crate) async fn page_total(
    pool: &PgPool,
    rows: &[PgRow],
    page: Pagination,
    count: QueryScalar<'_, Postgres, i64, PgArguments>,
) -> Result<i64, DbError> {
    match rows.first() {
        Some(row) => Ok(row.try_get("total")?),
        None if page.offset() == 0 => Ok(0),
        None => Ok(count.fetch_one(pool).await?),
    }
}
