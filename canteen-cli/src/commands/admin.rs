//! `canteen admin`: bootstrap administrator accounts
//!
//! Admins cannot register over HTTP, so the first one is created here.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use canteen_core::AppConfig;
use canteen_server::auth::hash_password;
use canteen_server::db::{AdminRepo, DbError};
use canteen_server::models::{Email, Password, PersonName};
use canteen_server::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Create an administrator account
    Create(CreateAdminArgs),
}

#[derive(Parser, Debug)]
pub struct CreateAdminArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Login email
    #[arg(long)]
    pub email: String,

    /// Login password (8-128 characters)
    #[arg(long, env = "CANTEEN_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_admin(args: AdminArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        AdminCommands::Create(args) => create_admin(args, config_path).await,
    }
}

async fn create_admin(args: CreateAdminArgs, config_path: Option<&Path>) -> Result<()> {
    // Validate before touching the database
    let name = PersonName::new(&args.name)?;
    let email = Email::new(&args.email)?;
    let password = Password::new(&args.password)?;
    let hash = hash_password(&password).context("Failed to hash password")?;

    let config = AppConfig::load(config_path).context("Failed to load configuration")?;
    let url = args.database_url.unwrap_or(config.database.url);
    let pool = create_pool(&url, 1)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    match AdminRepo::new(&pool).create(&name, &email, &hash).await {
        Ok(admin) => {
            println!("✓ Created admin {} <{}> ({})", admin.name, admin.email, admin.id);
            Ok(())
        }
        Err(DbError::Conflict { .. }) => Err(anyhow!(
            "an admin with email {} already exists",
            email.as_str()
        )),
        Err(e) => Err(e).context("Failed to create admin"),
    }
}
