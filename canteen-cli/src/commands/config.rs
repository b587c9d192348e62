use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use canteen_core::AppConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default config file
    Init(InitArgs),
    /// Print the effective config with secrets redacted
    Show,
    /// Check every setting and report all problems
    Validate,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args, config_path),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Validate => run_validate(config_path),
        ConfigCommands::Path => run_path(config_path),
    }
}

fn target_path(config_path: Option<&Path>) -> std::path::PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path)
}

fn run_init(args: InitArgs, config_path: Option<&Path>) -> Result<()> {
    let path = target_path(config_path);

    if path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    // Secrets stay as ${VAR} references so the file is safe to commit
    let written = AppConfig::default()
        .save(Some(&path))
        .context(format!("Failed to write config file: {:?}", path))?;

    println!("✅ Created config at: {:?}", written);
    println!("\nNext steps:");
    println!("  1. Export CANTEEN_JWT_SECRET, RAZORPAY_* and CLOUDINARY_* (or put them in .env)");
    println!("  2. Edit [database] url to point at your Postgres");
    println!("  3. Run: canteen config validate");

    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;

    let toml_str = toml::to_string_pretty(&config.redacted())
        .context("Failed to serialize config to TOML")?;

    println!("{}", toml_str);

    Ok(())
}

fn run_validate(config_path: Option<&Path>) -> Result<()> {
    println!("🔍 Validating configuration...");

    let config = AppConfig::load(config_path)?;
    println!("   ✓ Config loaded successfully");

    if let Err(e) = config.validate() {
        eprintln!("\n❌ {}", e);
        std::process::exit(1);
    }

    if config.payments.webhook_secret.is_empty() {
        println!("   ⚠  payments.webhook_secret is empty; webhooks will be refused");
    }

    println!("\n✅ Configuration valid!");

    Ok(())
}

fn run_path(config_path: Option<&Path>) -> Result<()> {
    println!("{}", target_path(config_path).display());
    Ok(())
}
