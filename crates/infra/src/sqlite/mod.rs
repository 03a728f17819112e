//! SQLite-backed stores.
//!
//! One pool serves every store trait. Identifiers are stored as 16-byte BLOBs,
//! timestamps as RFC 3339 text and audit metadata as JSON text.
//!
//! ## Error mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database (unique violation) | `Conflict` |
//! | RowNotFound | `NotFound` |
//! | anything else | `Backend` |

mod audit;
mod catalog;
mod inventory;
mod rows;
mod users;
mod work_orders;

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::store::StoreError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sites (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        region TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS materials (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        unit TEXT NOT NULL,
        description TEXT,
        reject_percent REAL NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        site_id BLOB NOT NULL,
        material_id BLOB NOT NULL,
        qty_on_hand REAL NOT NULL DEFAULT 0,
        reorder_point REAL NOT NULL DEFAULT 0,
        PRIMARY KEY (site_id, material_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_orders (
        id BLOB PRIMARY KEY,
        site_id BLOB NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        equipment_id BLOB,
        planned_date TEXT,
        assigned_team TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_order_materials (
        id BLOB PRIMARY KEY,
        work_order_id BLOB NOT NULL REFERENCES work_orders(id) ON DELETE CASCADE,
        material_id BLOB NOT NULL,
        qty_planned REAL NOT NULL DEFAULT 0,
        qty_fact REAL NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_order_comments (
        id BLOB PRIMARY KEY,
        work_order_id BLOB NOT NULL REFERENCES work_orders(id) ON DELETE CASCADE,
        author_id BLOB NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        login TEXT NOT NULL UNIQUE,
        email TEXT,
        password_hash TEXT NOT NULL,
        blocked INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role_id BLOB NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, role_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id BLOB NOT NULL,
        type TEXT NOT NULL,
        text TEXT NOT NULL,
        severity TEXT NOT NULL,
        created_at TEXT NOT NULL,
        meta TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_work_orders_site ON work_orders(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at)",
];

/// SQLite implementation of every store trait.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// In-memory URLs get a single never-recycled connection, since each SQLite
    /// connection would otherwise see its own empty database.
    #[instrument(err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(10))
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "sqlite store ready");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent: every statement is `IF NOT EXISTS`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict(format!("unique constraint violated in {operation}"));
    }
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row"),
        sqlx::Error::Database(db_err) => StoreError::backend(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite:file:test?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://data/maintops.db"));
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }
}
