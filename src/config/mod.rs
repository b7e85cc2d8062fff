//! Configuration module.
//!
//! Configuration is assembled from JSON documents (file, stdin or an inline
//! environment variable), compiled defaults and `CADENCE__` environment
//! overrides.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Connection housekeeping and match engine settings
//! - [`auth`]: Login verification settings
//! - [`logging`]: Logging configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod auth;
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use auth::{AuthConfig, StaticUserEntry};

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use server::{MultiplayerConfig, ServerConfig};

pub use types::Config;

pub use validation::validate_config;

pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 8085);
        assert_eq!(config.server.ping_interval_secs, 15);
        assert_eq!(config.server.ping_timeout_secs, 60);
        assert_eq!(config.server.outbound_queue_capacity, 256);
        assert_eq!(config.multiplayer.countdown_ms, 5000);
        assert!(config.auth.allow_guests);
        assert!(config.auth.users.is_empty());

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "cadence.log");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.multiplayer.countdown_ms,
            deserialized.multiplayer.countdown_ms
        );
        assert_eq!(
            config.server.max_message_size,
            deserialized.server.max_message_size
        );
    }

    #[test]
    fn test_partial_documents_fill_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"multiplayer":{"countdown_ms":1000},"logging":{"level":"LOUD"}}"#,
        )
        .unwrap();
        assert_eq!(config.multiplayer.countdown_ms, 1000);
        assert_eq!(config.multiplayer.max_concurrent_games, 2000);
        assert_eq!(config.logging.level, None);
        assert_eq!(config.port, 8085);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::parse(" Warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("err"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_sections_fill_missing_fields() {
        let config: Config = serde_json::from_str(
            r#"{"logging":{"level":null,"format":"text"},"websocket":{}}"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, None);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.websocket.auth_timeout_secs, 10);
    }

    #[test]
    fn test_auth_timeout_bounds() {
        let mut websocket = WebSocketConfig::default();
        assert!(websocket.validate().is_ok());
        websocket.auth_timeout_secs = 0;
        assert!(websocket.validate().is_err());
        websocket.auth_timeout_secs = 61;
        assert!(websocket.validate().is_err());
        websocket.auth_timeout_secs = 60;
        assert!(websocket.validate().is_ok());
    }
}
