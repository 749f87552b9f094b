//! The main application logic, decoupled from the entry point.

use crate::{
    aggregator::Aggregator,
    config::Config,
    core::{IndicatorLookup, ReputationLookup, ScanStore},
    intel::{IndicatorClient, ReputationClient},
    internal_metrics::MetricsBuilder,
    server::{build_router, ApiServer, AppState},
    status::StatusReport,
    storage::{SqliteScanStore, UnavailableStore},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    status: StatusReport,
    store: Arc<dyn ScanStore>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the API server actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The status captured at startup.
    pub fn status(&self) -> &StatusReport {
        &self.status
    }

    /// Waits for the shutdown signal, then drains the tasks and closes the store.
    pub async fn run(self) -> Result<()> {
        self.task_manager.wait_for_shutdown().await;
        info!("Shutdown signal received. Waiting for tasks to complete...");
        self.task_manager.shutdown().await;
        self.store.close().await;
        Ok(())
    }
}

/// Builder for the main application.
///
/// Collaborators can be overridden so tests can run the full HTTP surface
/// against stubbed lookups or a prepared store.
pub struct AppBuilder {
    config: Config,
    reputation_override: Option<Arc<dyn ReputationLookup>>,
    indicator_override: Option<Arc<dyn IndicatorLookup>>,
    store_override: Option<Arc<dyn ScanStore>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            reputation_override: None,
            indicator_override: None,
            store_override: None,
        }
    }

    /// Overrides the reputation lookup for testing.
    pub fn reputation_override(mut self, lookup: Arc<dyn ReputationLookup>) -> Self {
        self.reputation_override = Some(lookup);
        self
    }

    /// Overrides the indicator lookup for testing.
    pub fn indicator_override(mut self, lookup: Arc<dyn IndicatorLookup>) -> Self {
        self.indicator_override = Some(lookup);
        self
    }

    /// Overrides the scan record store for testing.
    pub fn store_override(mut self, store: Arc<dyn ScanStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    /// Builds every component, binds the listener and starts serving.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Metrics
        // =========================================================================
        let (metrics, prometheus) = MetricsBuilder::new(config.metrics.clone()).build();

        // =========================================================================
        // 2. Store
        // =========================================================================
        let store: Arc<dyn ScanStore> = match self.store_override {
            Some(store) => store,
            None => match SqliteScanStore::connect(&config.database).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(
                        error = %e,
                        "Could not open the scan record store; scans will not be persisted"
                    );
                    Arc::new(UnavailableStore::new(e.to_string()))
                }
            },
        };

        // =========================================================================
        // 3. Upstream clients
        // =========================================================================
        let reputation: Arc<dyn ReputationLookup> = match self.reputation_override {
            Some(lookup) => lookup,
            None => Arc::new(
                ReputationClient::new(&config.reputation)
                    .context("failed to build reputation service client")?,
            ),
        };
        let indicators: Arc<dyn IndicatorLookup> = match self.indicator_override {
            Some(lookup) => lookup,
            None => Arc::new(
                IndicatorClient::new(&config.indicator)
                    .context("failed to build indicator service client")?,
            ),
        };

        // =========================================================================
        // 4. Startup status
        // =========================================================================
        let reputation_key_loaded = config.reputation.api_key().is_some();
        let indicator_key_loaded = config.indicator.api_key().is_some();
        let status =
            StatusReport::capture(store.as_ref(), reputation_key_loaded, indicator_key_loaded)
                .await;

        // =========================================================================
        // 5. HTTP server
        // =========================================================================
        let state = AppState {
            aggregator: Aggregator::new(reputation, indicators),
            store: store.clone(),
            status: Arc::new(status.clone()),
            reputation_key_loaded,
            metrics,
            prometheus,
        };
        let router = build_router(state, config.server.allow_any_origin);

        let listener = TcpListener::bind(config.server.listen_address)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen_address))?;
        let local_addr = listener.local_addr()?;
        debug!(%local_addr, "Listener bound");

        let server = ApiServer::new(listener, router, task_manager.get_shutdown_rx());
        task_manager.spawn("ApiServer", server.run());

        info!("ThreatScan initialized successfully. Serving on {}", local_addr);

        Ok(App {
            task_manager,
            local_addr,
            status,
            store,
        })
    }
}
