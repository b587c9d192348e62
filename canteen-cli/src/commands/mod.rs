//! Command implementations for the canteen CLI

pub mod admin;
pub mod config;
pub mod migrate;
pub mod serve;

// Re-export main dispatcher functions for flat access from main.rs
pub use admin::run_admin;
pub use config::run_config;
pub use migrate::run_migrate;
pub use serve::run_serve;
