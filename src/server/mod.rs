//! # API Server
//!
//! The `axum` router exposing the scan service:
//!
//! - `GET /` returns the status captured at startup.
//! - `GET /scan?domain=<name>` runs one scan and returns the record.
//! - `GET /metrics` renders Prometheus metrics, when metrics are enabled.
//!
//! The server stops accepting connections when the shutdown signal fires and
//! lets in-flight requests finish.

pub mod handlers;

use crate::aggregator::Aggregator;
use crate::core::ScanStore;
use crate::internal_metrics::Metrics;
use crate::status::StatusReport;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub store: Arc<dyn ScanStore>,
    pub status: Arc<StatusReport>,
    /// Whether the reputation API key was present at startup.
    pub reputation_key_loaded: bool,
    pub metrics: Metrics,
    pub prometheus: Option<PrometheusHandle>,
}

/// Builds the router for `state`, optionally answering CORS from any origin.
pub fn build_router(state: AppState, allow_any_origin: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::home))
        .route("/scan", get(handlers::scan));

    if state.prometheus.is_some() {
        router = router.route("/metrics", get(handlers::metrics));
    }

    let router = router.with_state(state);
    if allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serves the API on an already-bound listener.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl ApiServer {
    pub fn new(listener: TcpListener, router: Router, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router,
            shutdown_rx,
        }
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let Self {
            listener,
            router,
            mut shutdown_rx,
        } = self;
        async move {
            let addr = listener.local_addr().ok();
            info!(?addr, "API server listening");
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await;
            if let Err(e) = result {
                error!("API server error: {}", e);
            }
            info!("API server stopped.");
        }
    }
}
