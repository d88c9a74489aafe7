//! hrm-ui - Settings workflow web service
//!
//! Serves the parameter wizard and the setting editor over HTTP,
//! backed by a SQLite database in the data folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrm_ui::{build_router, config, AppState};

#[derive(Parser, Debug)]
#[command(name = "hrm-ui")]
#[command(about = "Settings workflow web service for HRM")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "HRM_UI_PORT")]
    port: u16,

    /// Data folder holding the database
    #[arg(short, long, env = "HRM_ROOT_FOLDER")]
    data_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrm_ui=debug,hrm_common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting hrm-ui on port {}", args.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let data_folder = config::resolve_data_folder(args.data_folder.as_ref());
    let db_path = config::database_path(&data_folder);
    info!("Database: {}", db_path.display());

    let db = hrm_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let policy = hrm_common::db::confidence::load_policy(&db)
        .await
        .context("Failed to load confidence policy")?;

    let state = AppState::new(db, policy);

    // Periodic session sweep.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            let dropped = sessions.sweep_expired().await;
            if dropped > 0 {
                info!("Swept {} expired sessions", dropped);
            }
        }
    });

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
