// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the ForYou triage core.
//!
//! Layered TOML configuration (XDG hierarchy + `FORYOU_` env overrides) with
//! `deny_unknown_fields` models, collected semantic validation, and miette
//! diagnostics with fuzzy key suggestions.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ForYouConfig;
pub use validation::validate_config;
