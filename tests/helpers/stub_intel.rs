//! Stub upstream lookups that count their calls.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use threatscan::core::{
    AnalysisStats, DomainAttributes, IndicatorLookup, IndicatorReport, ReputationLookup, Score,
};
use threatscan::intel::LookupError;

/// Either a canned success or a canned non-200 answer.
#[derive(Debug, Clone)]
pub enum Canned<T> {
    Ok(T),
    Status(u16, &'static str),
}

impl<T: Clone> Canned<T> {
    fn answer(&self, service: &'static str) -> Result<T, LookupError> {
        match self {
            Canned::Ok(value) => Ok(value.clone()),
            Canned::Status(code, body) => Err(LookupError::Status {
                service,
                status: StatusCode::from_u16(*code).unwrap(),
                body: body.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct StubReputation {
    canned: Canned<DomainAttributes>,
    calls: AtomicUsize,
}

impl StubReputation {
    pub fn new(canned: Canned<DomainAttributes>) -> Self {
        Self {
            canned,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationLookup for StubReputation {
    async fn lookup_reputation(&self, _domain: &str) -> Result<DomainAttributes, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.canned.answer("reputation service")
    }
}

#[derive(Debug)]
pub struct StubIndicators {
    canned: Canned<IndicatorReport>,
    calls: AtomicUsize,
}

impl StubIndicators {
    pub fn new(canned: Canned<IndicatorReport>) -> Self {
        Self {
            canned,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorLookup for StubIndicators {
    async fn lookup_indicators(&self, _domain: &str) -> Result<IndicatorReport, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.canned.answer("indicator service")
    }
}

/// The attributes of the `example.com` fixture.
pub fn example_attributes() -> DomainAttributes {
    DomainAttributes {
        reputation: Some(5),
        last_analysis_stats: Some(AnalysisStats {
            harmless: 70,
            malicious: 0,
            suspicious: 0,
            undetected: 2,
        }),
        categories: json!({"Sophos": "business"}).as_object().cloned(),
        whois: Some("Domain Name: EXAMPLE.COM".to_string()),
    }
}

/// The pulse data of the `example.com` fixture.
pub fn example_indicators() -> IndicatorReport {
    IndicatorReport {
        domain: "example.com".to_string(),
        pulse_count: 2,
        related_pulses: vec!["p1".to_string(), "p2".to_string()],
        reputation: Score::Value(3),
    }
}
