//! Outbound lookups against the third-party threat-intelligence services.
//!
//! Both clients share the same transport discipline: one GET per call, the
//! API key in a request header, a fixed per-call timeout and no retries.
//! Every failure is returned as a [`LookupError`] so callers can render it
//! into a response body instead of failing the request.

pub mod indicator;
pub mod reputation;

pub use indicator::IndicatorClient;
pub use reputation::ReputationClient;

use crate::config::UpstreamConfig;
use crate::core::ErrorDescriptor;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Why an intelligence client could not be constructed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid {service} base URL {url:?}: {source}")]
    InvalidBaseUrl {
        service: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{service} base URL {url:?} cannot take path segments")]
    OpaqueBaseUrl { service: &'static str, url: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why an upstream lookup produced no data.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{service} API key not loaded")]
    MissingApiKey { service: &'static str },

    #[error("{service} returned {}", .status.as_u16())]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unreadable response from {service}: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl LookupError {
    /// Renders the error as the `{error, details}` body shape.
    pub fn descriptor(&self) -> ErrorDescriptor {
        match self {
            LookupError::MissingApiKey { .. } => ErrorDescriptor::new(self.to_string()),
            LookupError::Status { body, .. } => {
                ErrorDescriptor::with_details(self.to_string(), body.clone())
            }
            LookupError::Transport { service, source }
            | LookupError::Decode { service, source } => ErrorDescriptor::with_details(
                format!("request to {service} failed"),
                source.to_string(),
            ),
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            LookupError::MissingApiKey { .. } => "missing_key",
            LookupError::Status { .. } => "bad_status",
            LookupError::Transport { .. } => "transport_error",
            LookupError::Decode { .. } => "decode_error",
        }
    }
}

/// The HTTP plumbing shared by both intelligence clients.
#[derive(Debug, Clone)]
pub(crate) struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    key_header: &'static str,
    service: &'static str,
}

impl UpstreamClient {
    pub(crate) fn new(
        service: &'static str,
        key_header: &'static str,
        config: &UpstreamConfig,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| ClientError::InvalidBaseUrl {
            service,
            url: config.base_url.clone(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::OpaqueBaseUrl {
                service,
                url: config.base_url.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key().map(str::to_string),
            key_header,
            service,
        })
    }

    pub(crate) fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Appends `segments` to the base URL. Each segment is percent-encoded
    /// whole, so `/`, `?` and `#` inside a segment stay inside it.
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issues a single GET for the path built from `segments` and decodes a
    /// 200 response as `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, LookupError> {
        let result = self.fetch(self.url_for(segments)).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome_label(),
        };
        metrics::counter!(
            "upstream_requests_total",
            "service" => self.service,
            "outcome" => outcome
        )
        .increment(1);
        if let Err(e) = &result {
            warn!(service = self.service, error = %e, "Upstream lookup failed");
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, LookupError> {
        let service = self.service;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LookupError::MissingApiKey { service })?;

        debug!(service, url = %url, "Sending upstream lookup");

        let response = self
            .http
            .get(url)
            .header(self.key_header, api_key)
            .send()
            .await
            .map_err(|source| LookupError::Transport { service, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                service,
                status,
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| LookupError::Decode { service, source })
    }
}
