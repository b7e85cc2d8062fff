//! Configuration loading and HTTP endpoint integration tests.
//!
//! Covers:
//! - Config loading from a file (`CADENCE_CONFIG_PATH`) and inline JSON
//!   (`CADENCE_CONFIG_JSON`)
//! - Environment variable overrides (`CADENCE__*`)
//! - Health endpoint (`/health`)
//! - Metrics endpoint (`/metrics`)

mod test_helpers;

use cadence_server::config::{self, Config};
use cadence_server::websocket::create_router;
use serde_json::json;
use std::env;
use std::io::Write;
use test_helpers::{connect_user, create_test_server, send_frame};

// ===========================================================================
// Config loading tests
// ===========================================================================

#[test]
fn test_config_from_json_string() {
    let json = r#"{
        "port": 9999,
        "server": { "ping_interval_secs": 5, "ping_timeout_secs": 20 },
        "auth": {
            "allow_guests": false,
            "users": [{ "ticket": "t-1", "id": 7, "username": "Keys" }]
        }
    }"#;

    let config: Config = serde_json::from_str(json).expect("parse should succeed");

    assert_eq!(config.port, 9999);
    assert_eq!(config.server.ping_interval_secs, 5);
    assert!(!config.auth.allow_guests);
    assert_eq!(config.auth.users[0].username, "Keys");
    // Non-specified fields should remain at defaults
    assert_eq!(config.multiplayer.countdown_ms, 5000);
    assert!(config::validate_config(&config).is_ok());
}

#[test]
fn test_invalid_timeouts_fail_validation() {
    let mut config = Config::default();
    config.server.ping_timeout_secs = config.server.ping_interval_secs;
    assert!(config::validate_config(&config).is_err());
}

#[test]
#[serial_test::serial]
fn test_file_config_with_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("cadence.json");
    let mut file = std::fs::File::create(&config_file).unwrap();
    file.write_all(br#"{"port": 7777, "multiplayer": {"countdown_ms": 900}}"#)
        .unwrap();

    env::set_var("CADENCE_CONFIG_PATH", config_file.to_str().unwrap());
    env::set_var("CADENCE__MULTIPLAYER__COUNTDOWN_MS", "1234");

    let config = config::load();

    env::remove_var("CADENCE_CONFIG_PATH");
    env::remove_var("CADENCE__MULTIPLAYER__COUNTDOWN_MS");

    // File value should be used for port
    assert_eq!(config.port, 7777);
    // Environment override should take precedence over the file
    assert_eq!(config.multiplayer.countdown_ms, 1234);
    assert_eq!(config.server.ping_timeout_secs, 60);
}

#[test]
#[serial_test::serial]
fn test_inline_json_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("cadence.json");
    std::fs::write(&config_file, r#"{"port": 7000, "auth": {"allow_guests": false}}"#).unwrap();

    env::set_var("CADENCE_CONFIG_PATH", config_file.to_str().unwrap());
    env::set_var("CADENCE_CONFIG_JSON", r#"{"port": 7001}"#);

    let config = config::load();

    env::remove_var("CADENCE_CONFIG_PATH");
    env::remove_var("CADENCE_CONFIG_JSON");

    assert_eq!(config.port, 7001);
    assert!(!config.auth.allow_guests);
}

#[test]
#[serial_test::serial]
fn test_unparseable_inline_json_is_skipped() {
    env::set_var("CADENCE_CONFIG_JSON", "{not json");
    let config = config::load();
    env::remove_var("CADENCE_CONFIG_JSON");

    assert_eq!(config.port, Config::default().port);
}

// ===========================================================================
// Health endpoint tests
// ===========================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = create_test_server().await;
    let app = create_router("*").with_state(server);

    let test_server = axum_test::TestServer::new(app).expect("test server should start");
    let response = test_server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

// ===========================================================================
// Metrics endpoint tests
// ===========================================================================

#[tokio::test]
async fn test_metrics_endpoint_reports_live_counts() {
    let server = create_test_server().await;
    let (host, _inbox) = connect_user(&server, 1).await;
    let (_browser, _browser_inbox) = connect_user(&server, 2).await;
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Live"}})).await);

    let app = create_router("http://localhost:3000").with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/metrics").await;
    response.assert_status_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["online_users"], 2);
    assert_eq!(json["active_games"], 1);
    assert_eq!(json["lobby_members"], 0);
    assert_eq!(json["connections"]["total_connections"], 2);
    assert_eq!(json["games"]["games_created"], 1);
    assert_eq!(json["packets"]["packets_handled"], 1);
}
