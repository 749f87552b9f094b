//! # Internal Metrics Module
//!
//! - **`Metrics`**: a lightweight, cloneable handle to the counters and
//!   histograms the scan flow updates.
//! - **`MetricsBuilder`**: installs the Prometheus recorder when metrics are
//!   enabled and hands back the handle used to render `/metrics`.
//!
//! Per-service upstream counters and store-write counters are recorded with
//! the macros at their call sites.

use crate::config::MetricsConfig;
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::error;

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub scans_total: Counter,
    pub scans_rejected_total: Counter,
    pub scan_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Registers descriptions with the global recorder and creates the handles.
    pub fn new() -> Self {
        metrics::describe_counter!(
            "scans_total",
            Unit::Count,
            "Total number of scan requests handled."
        );
        metrics::describe_counter!(
            "scans_rejected_total",
            Unit::Count,
            "Scans answered with an error body instead of a record."
        );
        metrics::describe_counter!(
            "upstream_requests_total",
            Unit::Count,
            "Outbound lookups, labeled by service and outcome."
        );
        metrics::describe_counter!(
            "store_writes_total",
            Unit::Count,
            "Scan record inserts, labeled by outcome."
        );
        metrics::describe_histogram!(
            "scan_duration_seconds",
            Unit::Seconds,
            "Time from receiving a scan request to answering it."
        );

        Self {
            scans_total: metrics::counter!("scans_total"),
            scans_rejected_total: metrics::counter!("scans_rejected_total"),
            scan_duration_seconds: metrics::histogram!("scan_duration_seconds"),
        }
    }

    /// Creates a `Metrics` instance whose handles record nothing.
    pub fn disabled() -> Self {
        Self {
            scans_total: Counter::noop(),
            scans_rejected_total: Counter::noop(),
            scan_duration_seconds: Histogram::noop(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder if metrics are enabled.
    ///
    /// Returns disabled metrics and no handle when metrics are off or the
    /// recorder cannot be installed.
    pub fn build(self) -> (Metrics, Option<PrometheusHandle>) {
        if !self.config.enabled {
            return (Metrics::disabled(), None);
        }

        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0],
        ) {
            Ok(builder) => builder,
            Err(e) => {
                error!("Invalid Prometheus bucket configuration: {}", e);
                return (Metrics::disabled(), None);
            }
        };

        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::disabled(), None);
        }

        (Metrics::new(), Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_installs_nothing() {
        let (metrics, handle) = MetricsBuilder::new(MetricsConfig { enabled: false }).build();
        assert!(handle.is_none());
        metrics.scans_total.increment(1);
    }
}
