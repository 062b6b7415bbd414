//! Configuration for the lifecycle engine.
//!
//! Configuration is loaded from a TOML file with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.

mod database;
mod notifications;
mod observability;
mod retention;

use std::path::Path;

#[cfg(feature = "database-sqlite")]
pub use database::SqliteConfig;
pub use database::DatabaseConfig;
pub use notifications::{NotificationsConfig, WebhookChannelConfig};
pub use observability::{LogFormat, LogLevel, LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use retention::{LeaseConfig, RetentionConfig, RetentionSafety};
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Record store.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Lifecycle scheduling and safety settings.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Deletion warning channel.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Observability configuration (logging, metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl WardenConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: WardenConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.enabled && self.database.is_none() {
            return Err(ConfigError::Validation(
                "retention.enabled requires a database configuration".into(),
            ));
        }

        self.database.validate()?;
        self.retention.validate()?;
        self.notifications.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

static ENV_VAR_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
});

/// Expand `${VAR}` references, leaving anything after a `#` untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_RE.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
