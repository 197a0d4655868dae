// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the ForYou triage core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level ForYou configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForYouConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Event bus settings.
    #[serde(default)]
    pub bus: BusConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "foryou".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "foryou.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds of inactivity after which the sweeper closes a session
    /// as abandoned.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Interval in seconds between sweeper passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Broadcast channel capacity; slow subscribers past this lag are skipped.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ForYouConfig::default();
        assert_eq!(config.service.name, "foryou");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.storage.database_path, "foryou.db");
        assert!(config.storage.wal_mode);
        assert_eq!(config.session.idle_timeout_secs, 1800);
        assert_eq!(config.session.sweep_interval_secs, 300);
        assert_eq!(config.bus.capacity, 256);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_str = r#"
[session]
idle_timeout_secs = 600
"#;
        let config: ForYouConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.idle_timeout_secs, 600);
        assert_eq!(config.session.sweep_interval_secs, 300);
        assert_eq!(config.storage.database_path, "foryou.db");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[storage]
database_path = "/tmp/foryou.db"
databse_path = "typo"
"#;
        assert!(toml::from_str::<ForYouConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let toml_str = r#"
[storge]
database_path = "/tmp/foryou.db"
"#;
        assert!(toml::from_str::<ForYouConfig>(toml_str).is_err());
    }
}
