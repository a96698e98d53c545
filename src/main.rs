use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod auth;
mod commands;
mod config;
mod db;
mod error;
mod highlight;
mod models;
mod token;

use config::Config;
use db::Database;
pub(crate) use error::{ApiError, ApiResult};
use highlight::Highlighter;

#[derive(Parser)]
#[command(about = "a pastebin")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Hard-delete pastes that were soft-deleted longer ago than the
    /// configured retention window.
    PurgeDeleted,
}

#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub database: Database,
    pub highlighter: Highlighter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // try to load .env, ignoring any errors
    _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config: Config = ::config::Config::builder()
        .add_source(::config::File::with_name("config.toml").required(false))
        .add_source(::config::Environment::with_prefix("SNIPBIN").separator("__"))
        .build()
        .context("failed to read config")?
        .try_deserialize()
        .context("failed to deserialize config")?;

    let database = Database::connect(&config.database.url).await?;
    let highlighter = Highlighter::new();

    let app = App {
        config,
        database,
        highlighter,
    };

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeDeleted => commands::purge_deleted::run(app).await,
    }
}
