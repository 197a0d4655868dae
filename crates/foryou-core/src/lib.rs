// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the ForYou triage core.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the ForYou workspace. All collaborator
//! adapters (risk classifier, storage, volunteer directory) implement traits
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ForYouError;
pub use types::{
    AdapterType, EscalationPriority, EscalationStatus, HealthStatus, MessageRole,
    RiskLevel, SessionStatus, TriageStatus,
};

// Re-export all adapter traits at crate root.
pub use traits::{PluginAdapter, RiskClassifier, StorageAdapter, VolunteerDirectory};
