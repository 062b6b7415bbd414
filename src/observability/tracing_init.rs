use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig, ObservabilityConfig};

/// Install the global tracing subscriber.
///
/// Logs go to stderr; stdout carries command output.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), TracingError> {
    let logging = &config.logging;
    let filter = build_env_filter(logging);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (&logging.format, logging.timestamps) {
        (LogFormat::Pretty, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line),
            )
            .try_init(),
        (LogFormat::Pretty, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .compact()
                    .with_target(true)
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line),
            )
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .compact()
                    .with_target(true)
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Json, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line)
                    .with_current_span(true),
            )
            .try_init(),
        (LogFormat::Json, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_file(logging.file_line)
                    .with_line_number(logging.file_line)
                    .with_current_span(true)
                    .without_time(),
            )
            .try_init(),
    };

    result.map_err(|e| TracingError::Init(e.to_string()))
}

/// `RUST_LOG` wins over the configured level and filter.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let base_level = match config.level {
        crate::config::LogLevel::Trace => "trace",
        crate::config::LogLevel::Debug => "debug",
        crate::config::LogLevel::Info => "info",
        crate::config::LogLevel::Warn => "warn",
        crate::config::LogLevel::Error => "error",
    };

    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else if let Some(filter) = &config.filter {
        let combined = format!("{},{}", base_level, filter);
        EnvFilter::try_new(combined).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else {
        // Quiet the store and HTTP client by default
        EnvFilter::new(format!("{},sqlx=warn,reqwest=warn,hyper=warn", base_level))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_env_filter_from_config() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LoggingConfig {
                level: LogLevel::Debug,
                filter: Some("warden::retention=trace".to_string()),
                ..Default::default()
            };
            let filter = build_env_filter(&config).to_string();
            assert!(filter.contains("debug"));
            assert!(filter.contains("warden::retention=trace"));
        });
    }

    #[test]
    fn test_rust_log_overrides_config() {
        temp_env::with_var("RUST_LOG", Some("error"), || {
            let config = LoggingConfig {
                level: LogLevel::Debug,
                filter: Some("warden=trace".to_string()),
                ..Default::default()
            };
            let filter = build_env_filter(&config).to_string();
            assert!(!filter.contains("warden=trace"));
            assert!(filter.contains("error"));
        });
    }
}
