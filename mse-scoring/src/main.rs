//! mse-scoring - Dynamic Scoring Engine service
//!
//! Serves the scoring API over HTTP, or loads an exported rule catalog into
//! the local database (`import-catalog`).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mse_common::config::{self, TomlConfig, ROOT_FOLDER_ENV};
use mse_common::db::init_database;
use mse_scoring::db::import::{import_catalog, CatalogDocument};
use mse_scoring::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 5760;
const DEFAULT_BIND: &str = "127.0.0.1";

/// Command-line arguments for mse-scoring
#[derive(Parser, Debug)]
#[command(name = "mse-scoring")]
#[command(about = "Dynamic Scoring Engine for multi-sport events")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MSE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Load a catalog document (modalities, models, rosters) into the database
    ImportCatalog {
        /// Catalog JSON file
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml = TomlConfig::load(args.config.as_deref()).context("Failed to load config file")?;

    let default_filter = toml.log_level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting mse-scoring v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml);
    let db_path = config::prepare_root_folder(&root_folder)
        .with_context(|| format!("Failed to prepare root folder {}", root_folder.display()))?;
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::ImportCatalog { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let doc: CatalogDocument = serde_json::from_str(&content)
                .with_context(|| format!("Invalid catalog document {}", file.display()))?;
            let summary = import_catalog(&pool, &doc).await?;
            info!(
                "Imported {} modalities, {} models, {} fields, {} roster entries",
                summary.modalities, summary.models, summary.fields, summary.roster_entries
            );
            Ok(())
        }
        Command::Serve => {
            let bind = args
                .bind
                .or(toml.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string());
            let port = args.port.or(toml.port).unwrap_or(DEFAULT_PORT);
            let addr: SocketAddr = format!("{}:{}", bind, port)
                .parse()
                .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

            let app = build_router(AppState::new(pool));

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("mse-scoring listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
