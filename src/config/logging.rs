//! `logging` section: where the server writes its tracing output.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    /// Base name of the rolling file, e.g. `cadence.log.2026-10-14`.
    pub filename: String,
    /// `daily`, `hourly` or `never`. Anything else rolls daily.
    pub rotation: String,
    /// Ignored when `RUST_LOG` is set.
    #[serde(deserialize_with = "lenient_level")]
    pub level: Option<LogLevel>,
    pub enable_file_logging: bool,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            filename: "cadence.log".to_string(),
            rotation: "daily".to_string(),
            level: None,
            enable_file_logging: false,
            format: LogFormat::Json,
        }
    }
}

/// A misspelt level keeps the server booting at the default level.
fn lenient_level<'de, D>(deserializer: D) -> Result<Option<LogLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let level = LogLevel::parse(&raw);
        if level.is_none() {
            eprintln!("logging.level '{raw}' is not recognised, falling back to info");
        }
        level
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Case-insensitive, accepting `warning` and `err` as aliases.
    pub fn parse(raw: &str) -> Option<Self> {
        let level = match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" | "err" => Self::Error,
            _ => return None,
        };
        Some(level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
