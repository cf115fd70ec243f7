use chrono::{DateTime, Utc};
use dh_common::Secret;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Platform, PlatformCode},
    traits::IntegrationError,
};

/// Raw row shape: credentials come out of the database as plain text and are wrapped in [`Secret`] exactly
/// once, here, so they never travel unredacted through the rest of the system.
#[derive(Debug, Clone, FromRow)]
struct PlatformRow {
    id: i64,
    code: PlatformCode,
    name: String,
    enabled: bool,
    api_key: String,
    webhook_secret: String,
    store_id: String,
    menu_sync_enabled: bool,
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PlatformRow> for Platform {
    fn from(row: PlatformRow) -> Self {
        Platform {
            id: row.id,
            code: row.code,
            name: row.name,
            enabled: row.enabled,
            api_key: Secret::new(row.api_key),
            webhook_secret: Secret::new(row.webhook_secret),
            store_id: row.store_id,
            menu_sync_enabled: row.menu_sync_enabled,
            last_sync_at: row.last_sync_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn fetch_platform(id: i64, conn: &mut SqliteConnection) -> Result<Option<Platform>, IntegrationError> {
    let row: Option<PlatformRow> =
        sqlx::query_as("SELECT * FROM platforms WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(Platform::from))
}

pub async fn fetch_platform_by_code(
    code: PlatformCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Platform>, IntegrationError> {
    let row: Option<PlatformRow> =
        sqlx::query_as("SELECT * FROM platforms WHERE code = $1").bind(code).fetch_optional(conn).await?;
    Ok(row.map(Platform::from))
}

pub async fn fetch_enabled_platforms(conn: &mut SqliteConnection) -> Result<Vec<Platform>, IntegrationError> {
    let rows: Vec<PlatformRow> =
        sqlx::query_as("SELECT * FROM platforms WHERE enabled = 1 ORDER BY id").fetch_all(conn).await?;
    Ok(rows.into_iter().map(Platform::from).collect())
}

pub async fn stamp_platform_sync(
    id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    let result = sqlx::query("UPDATE platforms SET last_sync_at = $1, updated_at = $1 WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(IntegrationError::PlatformNotFound(format!("id {id}")));
    }
    Ok(())
}

/// Inserts a platform row. Used by the test fixtures and the (out-of-scope) administration surface.
pub async fn insert_platform(
    code: PlatformCode,
    name: &str,
    api_key: &str,
    webhook_secret: &str,
    store_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Platform, IntegrationError> {
    let row: PlatformRow = sqlx::query_as(
        r#"
            INSERT INTO platforms (code, name, api_key, webhook_secret, store_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(code)
    .bind(name)
    .bind(api_key)
    .bind(webhook_secret)
    .bind(store_id)
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

pub async fn set_platform_enabled(
    id: i64,
    enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    sqlx::query("UPDATE platforms SET enabled = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(enabled)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
