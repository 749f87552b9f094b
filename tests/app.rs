//! End-to-end tests: the full application against mock upstream services.

use anyhow::Result;
use serde_json::{json, Value};
use std::time::Duration;
use threatscan::app::App;
use threatscan::config::Config;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    base_url: String,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
}

impl TestApp {
    async fn start(config: Config) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::builder(config).build(shutdown_rx).await?;
        let base_url = format!("http://{}", app.local_addr());
        let handle = tokio::spawn(app.run());
        Ok(Self {
            base_url,
            shutdown_tx,
            handle,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = reqwest::get(format!("{}{}", self.base_url, path)).await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        Ok(response.json().await?)
    }

    async fn shutdown(self) -> Result<()> {
        self.shutdown_tx.send(true)?;
        timeout(Duration::from_secs(5), self.handle).await???;
        Ok(())
    }
}

fn test_config(reputation: &MockServer, indicator: &MockServer) -> Config {
    let mut config = Config::default();
    config.server.listen_address = "127.0.0.1:0".parse().unwrap();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.reputation.base_url = reputation.uri();
    config.reputation.api_key = Some("vt-key".to_string());
    config.indicator.base_url = indicator.uri();
    config.indicator.api_key = Some("otx-key".to_string());
    config
}

#[tokio::test]
async fn test_scan_end_to_end() -> Result<()> {
    let reputation = MockServer::start().await;
    let indicator = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/domains/example.com"))
        .and(header("x-apikey", "vt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"attributes": {
                "reputation": 5,
                "last_analysis_stats": {
                "harmless": 70, "malicious": 0, "suspicious": 0, "undetected": 2
            },
                "categories": {"Sophos": "business"},
                "whois": "Domain Name: EXAMPLE.COM"
            }}
        })))
        .expect(1)
        .mount(&reputation)
        .await;
    Mock::given(method("GET"))
        .and(path("/indicators/domain/example.com/general"))
        .and(header("X-OTX-API-KEY", "otx-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pulse_info": {"count": 2, "pulses": [{"name": "p1"}, {"name": "p2"}]},
            "reputation": 3
        })))
        .expect(1)
        .mount(&indicator)
        .await;

    let app = TestApp::start(test_config(&reputation, &indicator)).await?;

    let status = app.get_json("/").await?;
    assert_eq!(status["database_status"], "Database connection successful");
    assert_eq!(status["virustotal_status"], "Reputation API key loaded");

    let body = app.get_json("/scan?domain=example.com").await?;
    assert_eq!(body["reputation"], 5);
    assert_eq!(body["indicatorData"]["pulseCount"], 2);
    assert_eq!(body["indicatorData"]["relatedPulses"], json!(["p1", "p2"]));
    assert_eq!(body["indicatorData"]["reputation"], 3);
    assert_eq!(body["id"], "1");

    app.shutdown().await
}

#[tokio::test]
async fn test_missing_keys_degrade_without_crashing() -> Result<()> {
    let reputation = MockServer::start().await;
    let indicator = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&reputation)
        .await;

    let mut config = test_config(&reputation, &indicator);
    config.reputation.api_key = None;
    config.indicator.api_key = Some(String::new());

    let app = TestApp::start(config).await?;

    let status = app.get_json("/").await?;
    assert_eq!(status["virustotal_status"], "Reputation API key not found");
    assert_eq!(status["alien_vault_status"], "Indicator API key not found");

    let body = app.get_json("/scan?domain=example.com").await?;
    assert_eq!(body, json!({"error": "API key not loaded"}));

    app.shutdown().await
}

#[tokio::test]
async fn test_unreachable_database_still_answers_scans() -> Result<()> {
    let reputation = MockServer::start().await;
    let indicator = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/domains/example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"attributes": {}}})))
        .mount(&reputation)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&indicator)
        .await;

    let mut config = test_config(&reputation, &indicator);
    config.database.url = "sqlite:///nonexistent-dir/threatscan.db".to_string();

    let app = TestApp::start(config).await?;

    let status = app.get_json("/").await?;
    assert!(status["database_status"]
        .as_str()
        .unwrap()
        .starts_with("Database connection failed"));

    let body = app.get_json("/scan?domain=example.com").await?;
    assert!(body.get("id").is_none());
    assert!(body["dbSaveError"].is_string());
    assert_eq!(
        body["indicatorData"],
        json!({"error": "indicator service returned 401", "details": "bad key"})
    );
    assert_eq!(body["whois"], "Not available");

    app.shutdown().await
}

#[tokio::test]
async fn test_cors_allows_any_origin() -> Result<()> {
    let reputation = MockServer::start().await;
    let indicator = MockServer::start().await;
    let app = TestApp::start(test_config(&reputation, &indicator)).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/", app.base_url))
        .header("Origin", "http://localhost:3000")
        .send()
        .await?;

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    app.shutdown().await
}
