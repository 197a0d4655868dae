// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Converts Figment deserialization errors into miette diagnostics with
//! "did you mean?" suggestions using Jaro-Winkler string similarity.

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// 0.75 catches common typos like `databse_path` -> `database_path`
/// while filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Every key the configuration model accepts, in `section.key` form.
/// Kept in sync with the structs in [`crate::model`].
pub const KNOWN_KEYS: &[&str] = &[
    "service.name",
    "service.log_level",
    "storage.database_path",
    "storage.wal_mode",
    "session.idle_timeout_secs",
    "session.sweep_interval_secs",
    "bus.capacity",
];

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(foryou::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref()))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction via fuzzy matching, if any.
        suggestion: Option<String>,
    },

    /// The configuration failed to parse or deserialize.
    #[error("configuration parse error: {message}")]
    #[diagnostic(code(foryou::config::parse))]
    Parse {
        /// Description of the failure as reported by figment.
        message: String,
    },

    /// A semantic validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(foryou::config::validation))]
    Validation {
        /// What constraint was violated.
        message: String,
    },
}

fn format_unknown_key_help(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {}", KNOWN_KEYS.join(", ")),
        None => format!("valid keys: {}", KNOWN_KEYS.join(", ")),
    }
}

/// Finds the closest known key to an unrecognized one, if it is close enough
/// to be a plausible typo.
pub fn suggest_key(unknown: &str) -> Option<String> {
    KNOWN_KEYS
        .iter()
        .map(|k| (*k, strsim::jaro_winkler(unknown, k)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k.to_string())
}

/// Converts a figment extraction error into a [`ConfigError`], attaching a
/// fuzzy suggestion when the error names an unknown key.
pub fn from_figment(err: &figment::Error) -> ConfigError {
    let message = err.to_string();
    // figment reports serde's deny_unknown_fields as "unknown field `x`".
    if let Some(start) = message.find("unknown field `")
        && let Some(rest) = message.get(start + "unknown field `".len()..)
        && let Some(end) = rest.find('`')
    {
        let key = rest[..end].to_string();
        let suggestion = suggest_key(&key);
        return ConfigError::UnknownKey { key, suggestion };
    }
    ConfigError::Parse { message }
}
