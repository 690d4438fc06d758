//! ReviewRoot authentication server.
//!
//! Serves the `/api/auth` endpoints over HTTP, backed by PostgreSQL or, for
//! local development, an in-memory user store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use reviewroot::{
    auth::TokenService,
    db::{Database, MemoryUserRepository, UserRepository},
};
use rr_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use tracing::info;

const HELP: &str = "\
Run the ReviewRoot authentication server

USAGE:
  rr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Keep users in process memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  JWT_SECRET                   Token signing secret, at least 32 characters (required)
  JWT_ALGORITHM                HS256, HS384 or HS512  [default: HS256]
  ACCESS_TOKEN_EXPIRE_MINUTES  Access token lifetime  [default: 1440]
  REFRESH_TOKEN_EXPIRE_DAYS    Refresh token lifetime  [default: 7]
  DATABASE_URL                 PostgreSQL connection string
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8000)
  METRICS_BIND                 Prometheus exporter address (disabled when unset)
  RUST_LOG                     Log filter  [default: info,sqlx=warn,hyper=warn]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.in_memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exposed on http://{addr}/metrics");
    }

    let (users, database): (Arc<dyn UserRepository>, Option<Database>) = match &config.database
    {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            (Arc::new(db.users()), Some(db))
        }
        None => {
            tracing::warn!("Running with the in-memory user store; data is lost on exit");
            (Arc::new(MemoryUserRepository::new()), None)
        }
    };

    let state = AppState::new(users, TokenService::new(config.tokens.clone()));
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
