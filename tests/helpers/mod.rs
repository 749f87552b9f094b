#![allow(dead_code)]
//! Shared stubs and fixtures for the integration tests.

pub mod stub_intel;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use threatscan::aggregator::Aggregator;
use threatscan::config::DatabaseConfig;
use threatscan::core::{IndicatorLookup, ReputationLookup, ScanStore};
use threatscan::internal_metrics::Metrics;
use threatscan::server::AppState;
use threatscan::status::StatusReport;
use threatscan::storage::SqliteScanStore;

/// An empty in-memory store. A single connection keeps every query on the
/// same database.
pub async fn memory_store() -> Arc<SqliteScanStore> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    Arc::new(SqliteScanStore::connect(&config).await.unwrap())
}

/// Builds request state around the given collaborators.
pub fn test_state(
    reputation: Arc<dyn ReputationLookup>,
    indicators: Arc<dyn IndicatorLookup>,
    store: Arc<dyn ScanStore>,
    reputation_key_loaded: bool,
) -> AppState {
    AppState {
        aggregator: Aggregator::new(reputation, indicators),
        store,
        status: Arc::new(StatusReport {
            message: "Backend running successfully!".to_string(),
            database_status: "Database connection successful".to_string(),
            virustotal_status: "Reputation API key loaded".to_string(),
            alien_vault_status: "Indicator API key loaded".to_string(),
        }),
        reputation_key_loaded,
        metrics: Metrics::disabled(),
        prometheus: None,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
