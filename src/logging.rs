use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt::time::UtcTime, layer::Identity, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber: stdout plus an optional rolling file.
///
/// `RUST_LOG` wins over `logging.level`; without either the filter is
/// `info`. The returned guard flushes the file writer when dropped, so the
/// binary holds it for the life of the process. Installing twice is a no-op.
#[must_use]
pub fn init_with_config(cfg: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = build_filter(cfg);

    match cfg.format {
        LogFormat::Json => init_json_logging(cfg, env_filter),
        LogFormat::Text => init_text_logging(cfg, env_filter),
    }
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cfg.level.map_or("info", |level| level.as_str());
        EnvFilter::new(level)
    })
}

fn init_json_logging(cfg: &LoggingConfig, env_filter: EnvFilter) -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if cfg.enable_file_logging {
        if let Some((writer, guard)) = file_writer(cfg) {
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer);
            let _ = registry.with(file_layer).try_init();
            return Some(guard);
        }
    }

    let _ = registry.with(Identity::new()).try_init();
    None
}

fn init_text_logging(cfg: &LoggingConfig, env_filter: EnvFilter) -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if cfg.enable_file_logging {
        if let Some((writer, guard)) = file_writer(cfg) {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer);
            let _ = registry.with(file_layer).try_init();
            return Some(guard);
        }
    }

    let _ = registry.with(Identity::new()).try_init();
    None
}

fn rotation_for(raw: &str) -> tracing_appender::rolling::Rotation {
    match raw.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    }
}

fn file_writer(cfg: &LoggingConfig) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({err}), continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        rotation_for(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    Some(tracing_appender::non_blocking(file_appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_appender::rolling::Rotation;

    #[test]
    fn rotation_names_are_case_insensitive() {
        assert_eq!(rotation_for("HOURLY"), Rotation::HOURLY);
        assert_eq!(rotation_for("never"), Rotation::NEVER);
        assert_eq!(rotation_for("weekly"), Rotation::DAILY);
    }
}
