//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Body limit sized for image uploads
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use canteen_core::{AppConfig, OrderingSection};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::auth::TokenKeys;
use crate::payments::{PaymentGateway, RazorpayGateway};
use crate::storage::{CloudinaryStore, ImageStore};

/// Room for multipart framing on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
        }
    }
}

/// Settings handlers read per request
#[derive(Debug, Clone)]
pub struct Settings {
    pub ordering: OrderingSection,
    pub currency: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub webhook_secret: String,
    pub image_folder: String,
    pub max_image_bytes: usize,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ordering: config.ordering.clone(),
            currency: config.payments.currency.clone(),
            payment_key_id: config.payments.key_id.clone(),
            payment_key_secret: config.payments.key_secret.clone(),
            webhook_secret: config.payments.webhook_secret.clone(),
            image_folder: config.images.folder.clone(),
            max_image_bytes: config.images.max_bytes,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenKeys,
    pub gateway: Arc<dyn PaymentGateway>,
    pub images: Arc<dyn ImageStore>,
    pub settings: Settings,
}

impl AppState {
    /// Build state with the Razorpay and Cloudinary clients from `config`.
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Self {
        let gateway = RazorpayGateway::new(
            &config.payments.key_id,
            &config.payments.key_secret,
            &config.payments.base_url,
        );
        let images = CloudinaryStore::new(
            &config.images.cloud_name,
            &config.images.api_key,
            &config.images.api_secret,
            &config.images.base_url,
        );

        Self {
            pool,
            tokens: TokenKeys::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl_hours),
            gateway: Arc::new(gateway),
            images: Arc::new(images),
            settings: Settings::from_config(config),
        }
    }
}

/// Assemble every route with CORS, tracing and the body limit.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        // Localhost only
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let body_limit = state.settings.max_image_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::admin::router())
        .merge(routes::canteens::router())
        .merge(routes::menu::router())
        .merge(routes::cart::router())
        .merge(routes::orders::router())
        .merge(routes::payments::router())
        .merge(routes::feedback::router())
        .merge(routes::exams::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&config.database.url, 10).await?;
/// let state = AppState::from_config(pool, &config);
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, config.cors_permissive);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn settings_copy_config_sections() {
        let mut config = AppConfig::default();
        config.payments.currency = "INR".into();
        config.images.max_bytes = 1024;
        config.ordering.priority_fee_paise = 500;

        let settings = Settings::from_config(&config);
        assert_eq!(settings.currency, "INR");
        assert_eq!(settings.max_image_bytes, 1024);
        assert_eq!(settings.ordering.priority_fee_paise, 500);
    }
}
