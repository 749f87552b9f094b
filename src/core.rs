//! Core domain types and service traits for ThreatScan
//!
//! This module defines the scan record returned to callers, the shapes
//! reported by the two upstream intelligence services, and the trait
//! contracts that connect the aggregator, the store and the HTTP surface.

use crate::intel::LookupError;
use crate::storage::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Placeholder reported when an upstream omits a score.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder reported when the reputation service has no WHOIS text.
pub const WHOIS_NOT_AVAILABLE: &str = "Not available";

/// An upstream score: an integer, or `"N/A"` when the upstream omitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Score {
    Value(i64),
    #[default]
    NotAvailable,
}

impl From<Option<i64>> for Score {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Score::NotAvailable, Score::Value)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Value(v) => serializer.serialize_i64(*v),
            Score::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Score::Value(v),
            Raw::Other(_) => Score::NotAvailable,
        })
    }
}

/// Per-verdict engine counts from the reputation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AnalysisStats {
    #[serde(default)]
    pub harmless: u64,
    #[serde(default)]
    pub malicious: u64,
    #[serde(default)]
    pub suspicious: u64,
    #[serde(default)]
    pub undetected: u64,
}

/// The domain attributes extracted from a successful reputation lookup.
///
/// Every field is independently optional upstream; defaults are applied when
/// the attributes are folded into a [`ScanRecord`].
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct DomainAttributes {
    #[serde(default)]
    pub reputation: Option<i64>,
    #[serde(default)]
    pub last_analysis_stats: Option<AnalysisStats>,
    #[serde(default)]
    pub categories: Option<Map<String, Value>>,
    #[serde(default)]
    pub whois: Option<String>,
}

/// A structured failure, rendered into response bodies as `{error, details}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDescriptor {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

impl From<&LookupError> for ErrorDescriptor {
    fn from(err: &LookupError) -> Self {
        err.descriptor()
    }
}

/// Pulse data reported by the indicator service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorReport {
    pub domain: String,
    pub pulse_count: u64,
    /// Pulse names in upstream order.
    pub related_pulses: Vec<String>,
    pub reputation: Score,
}

/// Whatever the indicator lookup produced; a failure is embedded, not raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndicatorOutcome {
    Found(IndicatorReport),
    Failed(ErrorDescriptor),
}

impl IndicatorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, IndicatorOutcome::Failed(_))
    }
}

impl From<Result<IndicatorReport, LookupError>> for IndicatorOutcome {
    fn from(result: Result<IndicatorReport, LookupError>) -> Self {
        match result {
            Ok(report) => IndicatorOutcome::Found(report),
            Err(e) => IndicatorOutcome::Failed(ErrorDescriptor::from(&e)),
        }
    }
}

/// The merged, persisted result of one domain scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// The domain exactly as the caller supplied it.
    pub domain: String,
    /// Local assembly time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub reputation: Score,
    pub analysis_stats: AnalysisStats,
    pub categories: Map<String, Value>,
    pub whois: String,
    pub indicator_data: IndicatorOutcome,
    /// Assigned by the store after a successful insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Set instead of `id` when the insert failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_save_error: Option<String>,
}

impl ScanRecord {
    /// Folds the upstream results into a fresh record, applying defaults
    /// for every field the reputation service left out.
    pub fn assemble(
        domain: &str,
        timestamp: String,
        attributes: DomainAttributes,
        indicator_data: IndicatorOutcome,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            timestamp,
            reputation: attributes.reputation.into(),
            analysis_stats: attributes.last_analysis_stats.unwrap_or_default(),
            categories: attributes.categories.unwrap_or_default(),
            whois: attributes
                .whois
                .unwrap_or_else(|| WHOIS_NOT_AVAILABLE.to_string()),
            indicator_data,
            id: None,
            db_save_error: None,
        }
    }
}

/// The result of the aggregation step.
///
/// `Rejected` carries only an error body: the primary source failed and
/// nothing else was attempted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ScanOutcome {
    Completed(ScanRecord),
    Rejected(ErrorDescriptor),
}

// =============================================================================
// Service Traits
// =============================================================================

/// Looks up a domain at the reputation service.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    /// Returns the domain attributes, or the reason the lookup failed.
    /// A single attempt is made per call.
    async fn lookup_reputation(&self, domain: &str) -> Result<DomainAttributes, LookupError>;
}

/// Looks up a domain at the indicator (pulse-sharing) service.
#[async_trait]
pub trait IndicatorLookup: Send + Sync {
    /// Returns pulse data for the domain, or the reason the lookup failed.
    async fn lookup_indicators(&self, domain: &str) -> Result<IndicatorReport, LookupError>;
}

/// Persists scan records as whole documents.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Checks that the backing database answers.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts the record as one new document and returns its identifier.
    async fn insert(&self, record: &ScanRecord) -> Result<String, StoreError>;

    /// Reads a record back by identifier, with `id` populated.
    async fn fetch(&self, id: &str) -> Result<Option<ScanRecord>, StoreError>;

    /// Releases the underlying connections.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_serializes_as_int_or_placeholder() {
        assert_eq!(serde_json::to_value(Score::Value(5)).unwrap(), json!(5));
        assert_eq!(serde_json::to_value(Score::NotAvailable).unwrap(), json!("N/A"));
    }

    #[test]
    fn score_treats_null_and_text_as_not_available() {
        let from_null: Score = serde_json::from_value(json!(null)).unwrap();
        let from_text: Score = serde_json::from_value(json!("N/A")).unwrap();
        let from_int: Score = serde_json::from_value(json!(-3)).unwrap();
        assert_eq!(from_null, Score::NotAvailable);
        assert_eq!(from_text, Score::NotAvailable);
        assert_eq!(from_int, Score::Value(-3));
    }

    #[test]
    fn assemble_fills_defaults_for_missing_attributes() {
        let record = ScanRecord::assemble(
            "example.com",
            "2024-01-01 00:00:00".to_string(),
            DomainAttributes::default(),
            IndicatorOutcome::Failed(ErrorDescriptor::new("indicator API key not loaded")),
        );

        assert_eq!(record.reputation, Score::NotAvailable);
        assert_eq!(record.analysis_stats, AnalysisStats::default());
        assert!(record.categories.is_empty());
        assert_eq!(record.whois, WHOIS_NOT_AVAILABLE);

        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(
            body["analysisStats"],
            json!({"harmless": 0, "malicious": 0, "suspicious": 0, "undetected": 0})
        );
        assert!(body.get("id").is_none());
        assert!(body.get("dbSaveError").is_none());
    }

    #[test]
    fn partial_stats_default_missing_keys() {
        let stats: AnalysisStats = serde_json::from_value(json!({"malicious": 4})).unwrap();
        assert_eq!(
            stats,
            AnalysisStats {
                malicious: 4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn indicator_outcome_round_trips_both_shapes() {
        let found = IndicatorOutcome::Found(IndicatorReport {
            domain: "example.com".to_string(),
            pulse_count: 1,
            related_pulses: vec!["p1".to_string()],
            reputation: Score::Value(0),
        });
        let failed = IndicatorOutcome::Failed(ErrorDescriptor::with_details(
            "indicator service returned 500",
            "boom",
        ));

        for outcome in [found, failed] {
            let json = serde_json::to_string(&outcome).unwrap();
            let back: IndicatorOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(back, outcome);
        }
    }
}
