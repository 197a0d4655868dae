// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./foryou.toml` > `~/.config/foryou/foryou.toml` >
//! `/etc/foryou/foryou.toml` with environment variable overrides via the
//! `FORYOU_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ForYouConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/foryou/foryou.toml` (system-wide)
/// 3. `~/.config/foryou/foryou.toml` (user XDG config)
/// 4. `./foryou.toml` (local directory)
/// 5. `FORYOU_*` environment variables
pub fn load_config() -> Result<ForYouConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ForYouConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ForYouConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ForYouConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ForYouConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ForYouConfig::default()))
        .merge(Toml::file("/etc/foryou/foryou.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("foryou/foryou.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("foryou.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `FORYOU_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("FORYOU_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: FORYOU_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("session_", "session.", 1)
            .replacen("bus_", "bus.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "foryou");
        assert_eq!(config.session.idle_timeout_secs, 1800);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[service]
name = "foryou-staging"
log_level = "debug"

[storage]
database_path = "/var/lib/foryou/foryou.db"
"#,
        )
        .unwrap();
        assert_eq!(config.service.name, "foryou-staging");
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.storage.database_path, "/var/lib/foryou/foryou.db");
        // Untouched sections keep defaults.
        assert!(config.storage.wal_mode);
        assert_eq!(config.bus.capacity, 256);
    }

    #[test]
    fn env_vars_override_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "foryou.toml",
                r#"
[session]
idle_timeout_secs = 900
"#,
            )?;
            jail.set_env("FORYOU_SESSION_IDLE_TIMEOUT_SECS", "120");
            let config: ForYouConfig = build_figment().extract()?;
            assert_eq!(config.session.idle_timeout_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn env_mapping_handles_underscore_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FORYOU_STORAGE_DATABASE_PATH", "/tmp/env.db");
            let config: ForYouConfig = build_figment().extract()?;
            assert_eq!(config.storage.database_path, "/tmp/env.db");
            Ok(())
        });
    }

    #[test]
    fn unknown_key_fails_extraction() {
        let result = load_config_from_str(
            r#"
[service]
nme = "typo"
"#,
        );
        assert!(result.is_err());
    }
}
