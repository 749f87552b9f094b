//! SQLite-backed document store for scan records.
//!
//! Each record is kept whole as a JSON document in a single table; the row id
//! is the record identifier handed back to callers.

use super::StoreError;
use crate::config::DatabaseConfig;
use crate::core::{ScanRecord, ScanStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Creates the 'scan_records' table if it doesn't exist.
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS scan_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        domain TEXT NOT NULL,
        document TEXT NOT NULL
    )";

/// A [`ScanStore`] on top of a pooled SQLite connection.
#[derive(Debug, Clone)]
pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    /// Opens the pool described by `config` and ensures the table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(&config.url)
            .await?;

        let store = Self::from_pool(pool).await?;
        info!(url = %config.url, "Scan record store ready");
        Ok(store)
    }

    /// Wraps an existing pool, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, record: &ScanRecord) -> Result<String, StoreError> {
        let document = serde_json::to_string(record)?;
        let result = sqlx::query("INSERT INTO scan_records (domain, document) VALUES (?, ?)")
            .bind(&record.domain)
            .bind(document)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid().to_string())
    }

    async fn fetch(&self, id: &str) -> Result<Option<ScanRecord>, StoreError> {
        let Ok(row_id) = id.parse::<i64>() else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT document FROM scan_records WHERE id = ?")
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let document: String = row.try_get("document")?;
                let mut record: ScanRecord = serde_json::from_str(&document)?;
                record.id = Some(id.to_string());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}
