//! Database initialization
//!
//! On first run the database file and schema are created
//! automatically; every statement here is idempotent so startup is
//! safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database at `db_path` and bring the
/// schema up to date.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL keeps template listing readable while a save is in flight.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables if they do not exist yet. Public so tests can
/// run against an in-memory pool.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_confidence_levels_table(pool).await?;
    crate::db::confidence::seed_defaults(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            owner TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            standard INTEGER NOT NULL DEFAULT 0,
            number_of_channels INTEGER NOT NULL DEFAULT 1,
            parameters TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (owner, kind, name)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_confidence_levels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS confidence_levels (
            file_format TEXT NOT NULL,
            parameter TEXT NOT NULL,
            level TEXT NOT NULL,
            PRIMARY KEY (file_format, parameter)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
