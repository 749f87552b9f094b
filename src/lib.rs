//! ThreatScan - domain threat-intelligence lookup service
//!
//! This library provides the scan pipeline: two upstream lookups merged into
//! one record, persisted, and served over HTTP.

pub mod aggregator;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod intel;
pub mod internal_metrics;
pub mod server;
pub mod status;
pub mod storage;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
