//! Lifecycle engine configuration.
//!
//! Retention windows are fixed per category and are not configurable.
//! This section only controls how and when the engine runs.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! enabled = true
//! interval_hours = 24
//! deduplicate_warnings = true
//!
//! [retention.safety]
//! dry_run = false
//! batch_size = 500
//! max_records_per_run = 100000
//!
//! [retention.lease]
//! enabled = true
//! ttl_secs = 3600
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Longest accepted worker interval (one year).
pub const MAX_INTERVAL_HOURS: u64 = 8760;

/// Longest accepted lease lifetime (seven days).
pub const MAX_LEASE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Lifecycle engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Whether the periodic worker runs.
    /// Default: false (must be explicitly enabled). One-shot `run` ignores this.
    #[serde(default)]
    pub enabled: bool,

    /// How often the worker runs a lifecycle pass (in hours).
    /// Default: 24 (once per day, matching the 24-hour notification window)
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Send each deletion warning once per record rather than on every pass
    /// that falls inside the notification window.
    /// Default: true
    #[serde(default = "default_true")]
    pub deduplicate_warnings: bool,

    /// Safety settings to prevent accidental data loss.
    #[serde(default)]
    pub safety: RetentionSafety,

    /// Lease guarding against overlapping passes.
    #[serde(default)]
    pub lease: LeaseConfig,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            deduplicate_warnings: true,
            safety: RetentionSafety::default(),
            lease: LeaseConfig::default(),
        }
    }
}

fn default_interval_hours() -> u64 {
    24
}

fn default_true() -> bool {
    true
}

/// Safety settings for lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSafety {
    /// If true, log what would be archived, anonymized, deleted or sent
    /// without changing anything.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Rows read per selection query.
    /// Default: 500
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum transitions per step per run. Set to 0 for unlimited.
    /// Default: 100000
    #[serde(default = "default_max_records_per_run")]
    pub max_records_per_run: u64,
}

impl Default for RetentionSafety {
    fn default() -> Self {
        Self {
            dry_run: false,
            batch_size: default_batch_size(),
            max_records_per_run: default_max_records_per_run(),
        }
    }
}

fn default_batch_size() -> u32 {
    500
}

fn default_max_records_per_run() -> u64 {
    100_000
}

/// Advisory job lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseConfig {
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lease lifetime. A crashed holder blocks other runners for at most this long.
    /// Default: 3600 (1 hour)
    #[serde(default = "default_lease_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_lease_ttl_secs(),
        }
    }
}

fn default_lease_ttl_secs() -> u64 {
    3600
}

impl RetentionConfig {
    /// Get the interval as a Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }

    /// Per-step transition cap, with 0 meaning unlimited.
    pub fn max_records_per_run(&self) -> u64 {
        if self.safety.max_records_per_run == 0 {
            u64::MAX
        } else {
            self.safety.max_records_per_run
        }
    }

    /// Lease lifetime, capped at [`MAX_LEASE_TTL_SECS`].
    pub fn lease_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease.ttl_secs.min(MAX_LEASE_TTL_SECS) as i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_hours == 0 {
            return Err(ConfigError::Validation(
                "retention.interval_hours must be at least 1".into(),
            ));
        }
        if self.interval_hours > MAX_INTERVAL_HOURS {
            return Err(ConfigError::Validation(format!(
                "retention.interval_hours must be at most {MAX_INTERVAL_HOURS}"
            )));
        }
        if self.safety.batch_size == 0 {
            return Err(ConfigError::Validation(
                "retention.safety.batch_size must be at least 1".into(),
            ));
        }
        if self.lease.enabled && self.lease.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "retention.lease.ttl_secs must be at least 1 when leasing is enabled".into(),
            ));
        }
        if self.lease.ttl_secs > MAX_LEASE_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "retention.lease.ttl_secs must be at most {MAX_LEASE_TTL_SECS}"
            )));
        }
        Ok(())
    }
}
