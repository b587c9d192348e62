//! `canteen serve`: run the HTTP API

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use canteen_core::AppConfig;
use canteen_server::{create_pool, migrations, run_server, AppState, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides `[server] bind`)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Skip running migrations at startup
    #[arg(long)]
    pub no_migrate: bool,
}

/// Run the HTTP server until Ctrl+C or SIGTERM
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = AppConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.server.cors_permissive |= args.cors_permissive;
    config.validate()?;

    let pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    if !args.no_migrate {
        migrations::run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    if config.payments.webhook_secret.is_empty() {
        tracing::warn!("payments.webhook_secret is empty; gateway webhooks will be refused");
    }

    let state = AppState::from_config(pool, &config);
    let server = ServerConfig {
        bind_addr: config.server.bind,
        cors_permissive: config.server.cors_permissive,
    };

    tracing::info!("Starting canteen server on {}", server.bind_addr);

    // Blocks until shutdown
    run_server(state, server).await.context("Server error")?;

    Ok(())
}
