//! Client for the domain-reputation service.

use super::{ClientError, LookupError, UpstreamClient};
use crate::config::UpstreamConfig;
use crate::core::{DomainAttributes, ReputationLookup};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

const SERVICE: &str = "reputation service";
const API_KEY_HEADER: &str = "x-apikey";

#[derive(Debug, Deserialize, Default)]
struct DomainReport {
    #[serde(default)]
    data: DomainData,
}

#[derive(Debug, Deserialize, Default)]
struct DomainData {
    #[serde(default)]
    attributes: DomainAttributes,
}

/// Looks domains up at `GET {base_url}/domains/{domain}`.
#[derive(Debug, Clone)]
pub struct ReputationClient {
    upstream: UpstreamClient,
}

impl ReputationClient {
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
impl ReputationLookup for ReputationClient {
    #[instrument(skip(self))]
    async fn lookup_reputation(&self, domain: &str) -> Result<DomainAttributes, LookupError> {
        let report: DomainReport = self
            .upstream
            .get_json(&["domains", domain])
            .await?;
        Ok(report.data.attributes)
    }
}
