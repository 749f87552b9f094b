//! Persistence of scan records.
//!
//! Saving is a soft operation: the record always comes back to the caller,
//! annotated either with the identifier the store generated or with the
//! reason the write failed.

pub mod sqlite;

pub use sqlite::SqliteScanStore;

use crate::core::{ScanRecord, ScanStore};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised by a [`ScanStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode scan record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database unavailable: {0}")]
    Unavailable(String),
}

/// Inserts `record` exactly once and annotates it with the outcome.
pub async fn save(store: &dyn ScanStore, mut record: ScanRecord) -> ScanRecord {
    match store.insert(&record).await {
        Ok(id) => {
            debug!(domain = %record.domain, id = %id, "Scan record stored");
            metrics::counter!("store_writes_total", "outcome" => "success").increment(1);
            record.id = Some(id);
        }
        Err(e) => {
            error!(domain = %record.domain, error = %e, "Failed to store scan record");
            metrics::counter!("store_writes_total", "outcome" => "failure").increment(1);
            record.db_save_error = Some(e.to_string());
        }
    }
    record
}

/// A store standing in for a database that could not be opened at startup.
///
/// Every operation fails with the original connection error, so scans keep
/// working and report `dbSaveError` instead.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ScanStore for UnavailableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn insert(&self, _record: &ScanRecord) -> Result<String, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn fetch(&self, _id: &str) -> Result<Option<ScanRecord>, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}
