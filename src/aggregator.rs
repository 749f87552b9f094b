//! Merges the two upstream lookups into one scan record.

use crate::core::{
    ErrorDescriptor, IndicatorLookup, IndicatorOutcome, ReputationLookup, ScanOutcome, ScanRecord,
};
use chrono::Local;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Timestamp layout stamped on every record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs the reputation lookup, then the indicator lookup, and assembles the
/// result.
///
/// The reputation service is the primary source: if it fails, the scan is
/// rejected and the indicator service is never called. An indicator failure
/// only degrades the record.
#[derive(Clone)]
pub struct Aggregator {
    reputation: Arc<dyn ReputationLookup>,
    indicators: Arc<dyn IndicatorLookup>,
}

impl Aggregator {
    pub fn new(
        reputation: Arc<dyn ReputationLookup>,
        indicators: Arc<dyn IndicatorLookup>,
    ) -> Self {
        Self {
            reputation,
            indicators,
        }
    }

    #[instrument(skip(self))]
    pub async fn aggregate(&self, domain: &str) -> ScanOutcome {
        let attributes = match self.reputation.lookup_reputation(domain).await {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(domain, error = %e, "Primary lookup failed, rejecting scan");
                return ScanOutcome::Rejected(ErrorDescriptor::from(&e));
            }
        };

        let indicator_data =
            IndicatorOutcome::from(self.indicators.lookup_indicators(domain).await);
        if indicator_data.is_failed() {
            info!(domain, "Indicator lookup failed, continuing with a partial record");
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        ScanOutcome::Completed(ScanRecord::assemble(
            domain,
            timestamp,
            attributes,
            indicator_data,
        ))
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator").finish_non_exhaustive()
    }
}
