//! DevCamper API - bootcamp directory backend
//!
//! Bootcamps, their courses and reviews, and the users who publish and review
//! them. List endpoints accept filter, select, sort and paging parameters.
//!
//! Documents live in PostgreSQL when `DATABASE_URL` is set and in memory
//! otherwise.

mod aggregates;
mod auth;
mod config;
mod db;
mod error;
mod mailer;
mod models;
mod query;
mod routes;
mod seed;
mod state;

use crate::config::{DatabaseConfig, Settings};
use crate::db::{DocumentStore, MemoryStore, PgStore};
use crate::mailer::SmtpMailer;
use crate::routes::create_router;
use crate::state::AppState;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "devcamper-api", version, about = "Bootcamp directory API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Import or delete fixture data
    Seed {
        /// Import the fixture files from DIR
        #[arg(short = 'i', long = "import", value_name = "DIR", num_args = 0..=1,
              default_missing_value = seed::DEFAULT_DIR, conflicts_with = "delete")]
        import: Option<PathBuf>,
        /// Delete all documents
        #[arg(short = 'd', long = "delete")]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!("Configuration loaded ({})", settings.app_env);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let store = init_store(&settings).await?;
            serve(store, settings).await
        }
        Command::Seed { import, delete } => {
            let store = seed_store(&settings).await?;
            if delete {
                seed::delete_all(store.as_ref()).await?;
            } else if let Some(dir) = import {
                seed::import(store.as_ref(), &dir).await?;
            } else {
                anyhow::bail!("Nothing to do: pass -i [DIR] to import or -d to delete");
            }
            Ok(())
        }
    }
}

async fn serve(store: Arc<dyn DocumentStore>, settings: Settings) -> anyhow::Result<()> {
    let mailer = Arc::new(SmtpMailer::new(&settings.mail)?);
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    let state = Arc::new(AppState::new(store, mailer, settings));
    let app = create_router(state);

    info!("Server listening on http://{}", addr);
    info!("API mounted at /api/v1 (bootcamps, courses, reviews, auth, users)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
///
/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,devcamper_api=debug,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// PostgreSQL when configured, the in-memory store otherwise
async fn init_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let Some(database) = &settings.database else {
        warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
        return Ok(Arc::new(MemoryStore::new()));
    };

    connect_postgres(database).await
}

/// Seeding requires PostgreSQL; an in-memory store would be discarded on exit
async fn seed_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    connect_postgres(settings.require_database()?).await
}

async fn connect_postgres(database: &DatabaseConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = PgStore::connect(database).await?;
    store.migrate().await?;
    info!(
        "Connected to PostgreSQL at {}:{} (TLS: {})",
        database.host, database.port, database.require_tls
    );
    Ok(Arc::new(store))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
