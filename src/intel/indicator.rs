//! Client for the indicator (pulse-sharing) service.

use super::{ClientError, LookupError, UpstreamClient};
use crate::config::UpstreamConfig;
use crate::core::{IndicatorLookup, IndicatorReport, Score};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

const SERVICE: &str = "indicator service";
const API_KEY_HEADER: &str = "X-OTX-API-KEY";

#[derive(Debug, Deserialize, Default)]
struct GeneralSection {
    #[serde(default)]
    pulse_info: PulseInfo,
    #[serde(default)]
    reputation: Score,
}

#[derive(Debug, Deserialize, Default)]
struct PulseInfo {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    pulses: Vec<Pulse>,
}

#[derive(Debug, Deserialize)]
struct Pulse {
    #[serde(default)]
    name: Option<String>,
}

/// Looks domains up at `GET {base_url}/indicators/domain/{domain}/general`.
#[derive(Debug, Clone)]
pub struct IndicatorClient {
    upstream: UpstreamClient,
}

impl IndicatorClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        Ok(Self {
            upstream: UpstreamClient::new(SERVICE, API_KEY_HEADER, config)?,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.upstream.has_api_key()
    }
}

#[async_trait]
impl IndicatorLookup for IndicatorClient {
    #[instrument(skip(self))]
    async fn lookup_indicators(&self, domain: &str) -> Result<IndicatorReport, LookupError> {
        let section: GeneralSection = self
            .upstream
            .get_json(&["indicators", "domain", domain, "general"])
            .await?;

        Ok(IndicatorReport {
            domain: domain.to_string(),
            pulse_count: section.pulse_info.count,
            related_pulses: section
                .pulse_info
                .pulses
                .into_iter()
                .filter_map(|p| p.name)
                .collect(),
            reputation: section.reputation,
        })
    }
}
