//! Storage of the per-format confidence policy.
//!
//! The shipped policy is seeded into the table on first run so an
//! administrator can tune individual rows with plain SQL; at load time
//! stored rows override the built-in ones.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::confidence::{ConfidenceLevel, ConfidencePolicy};
use crate::params::ParamName;
use crate::Result;

/// Load the effective policy: the built-in rows overlaid with
/// whatever the table holds.
pub async fn load_policy(pool: &SqlitePool) -> Result<ConfidencePolicy> {
    let rows = sqlx::query("SELECT file_format, parameter, level FROM confidence_levels")
        .fetch_all(pool)
        .await?;

    let mut stored = HashMap::new();
    for row in rows {
        let file_format: String = row.get("file_format");
        let parameter: String = row.get("parameter");
        let level: String = row.get("level");
        let Some(name) = ParamName::parse(&parameter) else {
            warn!("Ignoring confidence row for unknown parameter: {}", parameter);
            continue;
        };
        let Some(level) = ConfidenceLevel::parse(&level) else {
            warn!("Ignoring confidence row with unknown level: {}", level);
            continue;
        };
        stored.insert((file_format, name), level);
    }

    let mut policy = ConfidencePolicy::built_in();
    policy.merge(ConfidencePolicy::new(stored));
    Ok(policy)
}

/// Write the built-in policy rows into an empty table. A table with
/// any rows at all is assumed administrator-managed and left alone.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM confidence_levels")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }
    let policy = ConfidencePolicy::built_in();
    let mut tx = pool.begin().await?;
    for (file_format, parameter, level) in policy.rows() {
        sqlx::query(
            "INSERT OR IGNORE INTO confidence_levels (file_format, parameter, level) \
             VALUES (?, ?, ?)",
        )
        .bind(file_format)
        .bind(parameter.as_str())
        .bind(level.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
