//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted upload body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    256 * 1024 * 1024 // 256 MiB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

/// How upload responses hand out download handles.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandleMode {
    /// Return the raw file ID; downloads accept both ids and issued tokens.
    #[default]
    Id,
    /// Return a freshly issued one-time token; raw ids are not accepted
    /// as download handles.
    Token,
}

/// Retention and eviction policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Lifetime of an uploaded file in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Age of last access after which an entry is considered idle, in seconds.
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u64,
    /// Interval between hard-expiry sweeps in seconds.
    #[serde(default = "default_expiry_sweep_interval_secs")]
    pub expiry_sweep_interval_secs: u64,
    /// Interval between idle-eviction sweeps in seconds.
    #[serde(default = "default_idle_sweep_interval_secs")]
    pub idle_sweep_interval_secs: u64,
    /// Handle issuance mode for upload responses.
    #[serde(default)]
    pub handle_mode: HandleMode,
}

fn default_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_idle_threshold_secs() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_expiry_sweep_interval_secs() -> u64 {
    60
}

fn default_idle_sweep_interval_secs() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            idle_threshold_secs: default_idle_threshold_secs(),
            expiry_sweep_interval_secs: default_expiry_sweep_interval_secs(),
            idle_sweep_interval_secs: default_idle_sweep_interval_secs(),
            handle_mode: HandleMode::default(),
        }
    }
}

impl RetentionConfig {
    /// Get the file TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Get the idle threshold as a Duration.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    /// Get the hard-expiry sweep interval as a Duration.
    /// A zero interval would make the sweep loop spin; clamp to one second.
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs.max(1))
    }

    /// Get the idle-eviction sweep interval as a Duration.
    pub fn idle_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.idle_sweep_interval_secs.max(1))
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retention and eviction policy.
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// Create a test configuration with defaults suitable for unit tests.
    ///
    /// **For testing only.** Storage points at a relative path that tests
    /// are expected to override.
    pub fn for_testing() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let config = AppConfig::default();
        assert_eq!(config.retention.ttl(), Duration::from_secs(600));
        assert_eq!(
            config.retention.idle_threshold(),
            Duration::from_secs(30 * 24 * 60 * 60)
        );
        assert_eq!(
            config.retention.expiry_sweep_interval(),
            Duration::from_secs(60)
        );
        assert_eq!(config.retention.handle_mode, HandleMode::Id);
    }

    #[test]
    fn zero_sweep_interval_is_clamped() {
        let retention = RetentionConfig {
            expiry_sweep_interval_secs: 0,
            idle_sweep_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(retention.expiry_sweep_interval(), Duration::from_secs(1));
        assert_eq!(retention.idle_sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn handle_mode_deserializes_lowercase() {
        let retention: RetentionConfig =
            serde_json::from_str(r#"{"handle_mode":"token"}"#).unwrap();
        assert_eq!(retention.handle_mode, HandleMode::Token);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        match config.storage {
            StorageConfig::Filesystem { path } => {
                assert_eq!(path, PathBuf::from("./data/storage"));
            }
        }
    }
}
