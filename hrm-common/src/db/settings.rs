//! Storage of settings: one row per (owner, kind, name), parameter
//! values serialized to a JSON column so a save is a single atomic
//! upsert.

use sqlx::{Row, SqlitePool};

use crate::setting::{Setting, SettingKind};
use crate::Result;

/// Directory entry for a stored setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRow {
    pub name: String,
    pub standard: bool,
}

/// Insert or replace the stored form of a setting. The default flag
/// is managed separately via [`set_default`] and preserved on update.
pub async fn save_setting(pool: &SqlitePool, setting: &Setting) -> Result<()> {
    let parameters = setting.values_to_json()?;
    sqlx::query(
        r#"
        INSERT INTO settings (owner, kind, name, number_of_channels, parameters, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (owner, kind, name) DO UPDATE SET
            number_of_channels = excluded.number_of_channels,
            parameters = excluded.parameters,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(setting.owner())
    .bind(setting.kind().as_str())
    .bind(setting.name())
    .bind(setting.number_of_channels() as i64)
    .bind(parameters)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load one stored setting, or `None` when it does not exist.
pub async fn load_setting(
    pool: &SqlitePool,
    owner: &str,
    kind: SettingKind,
    name: &str,
) -> Result<Option<Setting>> {
    let row = sqlx::query(
        "SELECT standard, number_of_channels, parameters \
         FROM settings WHERE owner = ? AND kind = ? AND name = ?",
    )
    .bind(owner)
    .bind(kind.as_str())
    .bind(name)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let standard: i64 = row.get("standard");
    let channels: i64 = row.get("number_of_channels");
    let parameters: String = row.get("parameters");

    let mut setting = Setting::new(kind);
    setting.set_name(name);
    setting.set_owner(owner);
    if standard != 0 {
        setting.make_default();
    }
    setting.set_number_of_channels(channels.max(1) as usize);
    setting.values_from_json(&parameters)?;
    Ok(Some(setting))
}

/// Delete one stored setting. Returns whether a row was removed.
pub async fn delete_setting(
    pool: &SqlitePool,
    owner: &str,
    kind: SettingKind,
    name: &str,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM settings WHERE owner = ? AND kind = ? AND name = ?")
        .bind(owner)
        .bind(kind.as_str())
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List the settings of one owner and kind, ordered by name.
pub async fn list_settings(
    pool: &SqlitePool,
    owner: &str,
    kind: SettingKind,
) -> Result<Vec<SettingRow>> {
    let rows = sqlx::query(
        "SELECT name, standard FROM settings \
         WHERE owner = ? AND kind = ? ORDER BY name",
    )
    .bind(owner)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| SettingRow {
            name: row.get("name"),
            standard: row.get::<i64, _>("standard") != 0,
        })
        .collect())
}

/// Whether a setting of this owner, kind and name exists.
pub async fn exists(
    pool: &SqlitePool,
    owner: &str,
    kind: SettingKind,
    name: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM settings WHERE owner = ? AND kind = ? AND name = ?",
    )
    .bind(owner)
    .bind(kind.as_str())
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Mark one setting as the owner's default for its kind, clearing the
/// flag from every sibling. Both steps run in one transaction so at
/// most one default survives any interleaving.
pub async fn set_default(
    pool: &SqlitePool,
    owner: &str,
    kind: SettingKind,
    name: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE settings SET standard = 0 WHERE owner = ? AND kind = ?")
        .bind(owner)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query(
        "UPDATE settings SET standard = 1 WHERE owner = ? AND kind = ? AND name = ?",
    )
    .bind(owner)
    .bind(kind.as_str())
    .bind(name)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
