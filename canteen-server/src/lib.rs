//! canteen-server: HTTP backend for campus canteen ordering
//!
//! Students browse canteen menus, fill a single-canteen cart, place
//! orders (optionally priority orders while one of their exams is
//! running) and pay through the payment gateway. Staff run their
//! canteen's queue; admins manage canteens, staff and the exam schedule.
//!
//! Layout:
//! - `models`: validated domain types
//! - `db`: Postgres pool, migrations and repositories
//! - `auth`: password hashing and bearer tokens
//! - `payments`: gateway client and signature checks
//! - `storage`: image upload backend
//! - `http`: axum router, extractors and handlers

pub mod auth;
pub mod db;
pub mod http;
pub mod models;
pub mod payments;
pub mod storage;

pub use db::{create_pool, migrations};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
