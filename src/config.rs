//! Configuration management for ThreatScan
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a `threatscan.toml` file, environment
//! variables and command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "threatscan.toml";

/// Environment names understood by earlier deployments of the service,
/// with the setting each one maps onto. The old `MONGODB_URI` is not read:
/// the store only speaks SQLite.
const LEGACY_ENV_KEYS: [(&str, &str); 2] = [
    ("VT_API_KEY", "reputation.api_key"),
    ("OTX_KEY", "indicator.api_key"),
];

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the HTTP listener.
    pub server: ServerConfig,
    /// Configuration for the scan record store.
    pub database: DatabaseConfig,
    /// Configuration for the domain-reputation service.
    pub reputation: UpstreamConfig,
    /// Configuration for the indicator (pulse-sharing) service.
    pub indicator: UpstreamConfig,
    /// Configuration for metrics collection.
    pub metrics: MetricsConfig,
}

/// Configuration for the HTTP listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address the API server binds to.
    pub listen_address: SocketAddr,
    /// Answer cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub allow_any_origin: bool,
}

/// Configuration for the scan record store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URI, e.g. `sqlite://threatscan.db?mode=rwc`.
    pub url: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Configuration for one upstream intelligence service.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL the lookup paths are appended to.
    pub base_url: String,
    /// API key sent with every request. Empty means unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl UpstreamConfig {
    /// Returns the API key if one was configured and is non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Configuration for metrics collection.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Config {
    /// Loads the application configuration, layering (lowest to highest):
    /// defaults, the TOML file, `THREATSCAN_*` variables, the legacy
    /// variable names and finally the command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. THREATSCAN_SERVER__LISTEN_ADDRESS=0.0.0.0:8000
            .merge(Env::prefixed("THREATSCAN_").split("__"));

        for (var, key) in LEGACY_ENV_KEYS {
            figment = figment.merge(Env::raw().only(&[var]).map(move |_| key.into()));
        }

        let config: Config = figment.merge(cli.clone()).extract()?;
        config.database.validate()?;
        Ok(config)
    }
}

impl DatabaseConfig {
    /// Rejects URLs the SQLite store cannot open.
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("sqlite:") {
            bail!(
                "unsupported database URL {:?}: only sqlite: URLs are supported",
                redact_credentials(&self.url)
            );
        }
        Ok(())
    }
}

/// Drops any `user:password@` part so the URL is safe to log.
fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
                allow_any_origin: true,
            },
            database: DatabaseConfig {
                url: "sqlite://threatscan.db?mode=rwc".to_string(),
                max_connections: default_max_connections(),
            },
            reputation: UpstreamConfig {
                base_url: "https://www.virustotal.com/api/v3".to_string(),
                api_key: None,
                timeout_seconds: default_timeout_seconds(),
            },
            indicator: UpstreamConfig {
                base_url: "https://otx.alienvault.com/api/v1".to_string(),
                api_key: None,
                timeout_seconds: default_timeout_seconds(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}
