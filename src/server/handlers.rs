//! Request handlers for the API routes.

use super::AppState;
use crate::core::{ErrorDescriptor, ScanOutcome};
use crate::status::StatusReport;
use crate::storage;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Body returned when the reputation key was missing at startup.
pub const KEY_NOT_LOADED: &str = "API key not loaded";

#[derive(Debug, Deserialize)]
pub struct ScanParams {
    pub domain: String,
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.status.as_ref().clone())
}

/// `GET /scan?domain=<name>`
///
/// Always answers 200 once a domain was supplied; failures are reported in
/// the body.
pub async fn scan(
    State(state): State<AppState>,
    params: Result<Query<ScanParams>, QueryRejection>,
) -> Response {
    let domain = match params {
        Ok(Query(params)) if !params.domain.is_empty() => params.domain,
        Ok(_) => {
            return missing_domain("domain must not be empty".to_string());
        }
        Err(rejection) => return missing_domain(rejection.body_text()),
    };

    Json(handle_scan(&state, &domain).await).into_response()
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Runs one scan: key guard, aggregation, then a single save.
#[instrument(skip(state))]
pub async fn handle_scan(state: &AppState, domain: &str) -> ScanOutcome {
    let start = Instant::now();
    state.metrics.scans_total.increment(1);

    let outcome = run_scan(state, domain).await;
    if let ScanOutcome::Rejected(_) = &outcome {
        state.metrics.scans_rejected_total.increment(1);
    }

    state.metrics.scan_duration_seconds.record(start.elapsed());
    outcome
}

async fn run_scan(state: &AppState, domain: &str) -> ScanOutcome {
    if !state.reputation_key_loaded {
        return ScanOutcome::Rejected(ErrorDescriptor::new(KEY_NOT_LOADED));
    }

    info!(domain, "Scanning domain");
    match state.aggregator.aggregate(domain).await {
        ScanOutcome::Completed(record) => {
            ScanOutcome::Completed(storage::save(state.store.as_ref(), record).await)
        }
        rejected @ ScanOutcome::Rejected(_) => rejected,
    }
}

fn missing_domain(details: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorDescriptor::with_details(
            "domain query parameter is required",
            details,
        )),
    )
        .into_response()
}
