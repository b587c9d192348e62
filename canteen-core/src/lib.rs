//! canteen-core: configuration and error types shared by the canteen
//! server and CLI.

pub mod config;
pub mod error;

pub use config::{
    AppConfig, AuthSection, DatabaseSection, ImagesSection, OrderingSection, PaymentsSection,
    ServerSection,
};
pub use error::{CoreError, Result};
