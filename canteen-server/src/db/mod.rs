//! Database layer - connection pool, schema and repositories
//!
//! - Pool sized from config, handlers borrow it per request
//! - Uniqueness and references enforced by Postgres constraints
//! - Transactions for order placement, payment capture and user deletion

pub mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod migrations;
pub mod pool;
pub mod repos;

pub use error::DbError;
pub use pool::{create_pool, lazy_pool};
pub use repos::*;
