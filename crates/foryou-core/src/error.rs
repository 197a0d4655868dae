// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the ForYou triage core.

use thiserror::Error;

/// The primary error type used across all ForYou adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ForYouError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Risk classifier errors (network failure, malformed response, timeout).
    ///
    /// Recovered locally by the session pipeline; never surfaced to the client.
    #[error("classifier error: {message}")]
    Classifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Target session is missing or already closed. The operation aborts with
    /// no partial state.
    #[error("session {session_id} unavailable: {reason}")]
    SessionUnavailable { session_id: String, reason: String },

    /// A claim lost the race: the escalation request is no longer waiting.
    #[error("escalation {escalation_id} is already claimed")]
    ClaimConflict { escalation_id: String },

    /// A decision or claim was attempted on a record that already reached a
    /// terminal state. A no-op with explanation, not a crash.
    #[error("{entity} {id} already resolved as {status}")]
    AlreadyResolved {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// An attempted state transition matches no rule for the entity.
    #[error("invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// The volunteer directory rejected a claim attempt.
    #[error("volunteer {volunteer_id} is not eligible to claim")]
    IneligibleVolunteer { volunteer_id: String },

    /// Requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
