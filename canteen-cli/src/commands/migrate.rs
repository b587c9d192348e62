//! `canteen migrate`: create or update the schema without serving

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use canteen_core::AppConfig;
use canteen_server::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;
    let url = args.database_url.unwrap_or(config.database.url);

    let pool = create_pool(&url, 1)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    println!("✓ Schema is up to date");
    Ok(())
}
