//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the service using the
//! `clap` crate. These arguments are parsed at startup and then merged, with
//! the highest priority, over the `threatscan.toml` file and environment
//! variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Domain threat-intelligence lookup service.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP API to listen on.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Connection URI for the scan record database.
    #[arg(long, value_name = "URI")]
    pub database_url: Option<String>,

    /// Logging level (e.g. "info", "debug").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Inserts `value` under `section.key`, creating the section if needed.
fn insert_nested(dict: &mut Dict, section: &str, key: &str, value: Value) {
    let mut inner = match dict.remove(section) {
        Some(Value::Dict(_, inner)) => inner,
        _ => Dict::new(),
    };
    inner.insert(key.into(), value);
    dict.insert(section.into(), Value::Dict(Tag::Default, inner));
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(addr) = self.listen {
            insert_nested(&mut dict, "server", "listen_address", Value::from(addr.to_string()));
        }

        if let Some(url) = &self.database_url {
            insert_nested(&mut dict, "database", "url", Value::from(url.clone()));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_given_flags_are_provided() {
        let cli = Cli::parse_from(["threatscan", "--database-url", "sqlite::memory:"]);
        let data = cli.data().unwrap();
        let dict = &data[&Profile::Default];

        assert!(dict.get("server").is_none());
        assert!(dict.get("log_level").is_none());
        let database = dict["database"].as_dict().unwrap();
        assert_eq!(database["url"].as_str(), Some("sqlite::memory:"));
    }
}
