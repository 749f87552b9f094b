//! Startup status captured once and served from `GET /`.

use crate::core::ScanStore;
use serde::Serialize;
use tracing::{info, warn};

pub const RUNNING_MESSAGE: &str = "Backend running successfully!";

/// Human-readable readiness of the database and the two API keys, as seen
/// when the process started. Never refreshed afterwards.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub message: String,
    pub database_status: String,
    pub virustotal_status: String,
    pub alien_vault_status: String,
}

impl StatusReport {
    /// Pings the store and records which API keys are present.
    pub async fn capture(
        store: &dyn ScanStore,
        reputation_key_loaded: bool,
        indicator_key_loaded: bool,
    ) -> Self {
        let database_status = match store.ping().await {
            Ok(()) => {
                let status = "Database connection successful".to_string();
                info!("{}", status);
                status
            }
            Err(e) => {
                let status = format!("Database connection failed: {e}");
                warn!("{}", status);
                status
            }
        };

        let virustotal_status = key_status("Reputation", reputation_key_loaded);
        let alien_vault_status = key_status("Indicator", indicator_key_loaded);

        Self {
            message: RUNNING_MESSAGE.to_string(),
            database_status,
            virustotal_status,
            alien_vault_status,
        }
    }
}

fn key_status(service: &str, loaded: bool) -> String {
    let status = if loaded {
        format!("{service} API key loaded")
    } else {
        format!("{service} API key not found")
    };
    if loaded {
        info!("{}", status);
    } else {
        warn!("{}", status);
    }
    status
}
