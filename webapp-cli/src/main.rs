//! webapp CLI - record management over the webapp persistence layer
//!
//! This is the main entry point for the `webapp` command-line tool, which provides:
//! - DDL output and table creation (`schema`, `init`)
//! - User record CRUD (`users` subcommand)
//!
//! Database settings come from webapp.toml, ~/.webapp/config.toml and
//! `WEBAPP_DB_*` environment variables (including ones loaded from .env).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use webapp_orm::{AppConfig, Dialect, Pool};

mod commands;
mod models;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "webapp",
    author,
    version,
    about = "Manage webapp records from the command line",
    long_about = "Create tables and read, insert, update and delete records through a pooled \
                  MySQL, Postgres or SQLite connection. Output is JSON on stdout."
)]
struct Cli {
    /// Config file (default: ./webapp.toml, then ~/.webapp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging, including executed SQL
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the DDL for every record type (no database access)
    Schema {
        /// SQL dialect to render column types for
        #[arg(long, default_value = "mysql")]
        driver: Dialect,
    },
    /// Create missing tables
    Init,
    /// User record operations (list, get, add, update, remove, count)
    Users(commands::users::UsersArgs),
}

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.webapp/.env
fn load_dotenv() {
    // dotenvy never overwrites variables that are already set
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
    }

    if let Some(env_file) = webapp_orm::config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(_) => debug!("Loaded .env from {}", env_file.display()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    load_dotenv();

    let schemas = models::register_all().context("Invalid record declaration")?;

    if let Commands::Schema { driver } = cli.command {
        return commands::run_schema(&schemas, driver);
    }

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let pool = Pool::create(&config.database)
        .await
        .context("Failed to connect to database")?;

    let result = tokio::select! {
        result = run(cli.command, &schemas, &pool) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning in-flight work");
            Err(anyhow::anyhow!("Interrupted"))
        }
    };

    pool.shutdown().await;
    info!("Shutdown complete");
    result
}

async fn run(command: Commands, schemas: &[&webapp_orm::Schema], pool: &Pool) -> Result<()> {
    match command {
        Commands::Schema { driver } => commands::run_schema(schemas, driver),
        Commands::Init => commands::run_init(schemas, pool).await,
        Commands::Users(args) => commands::run_users(args, pool).await,
    }
}
