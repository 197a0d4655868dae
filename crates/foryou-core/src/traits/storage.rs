// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::ForYouError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    EscalationRequest, Message, RiskLevel, Session, SessionStatus, TriageRecord,
    TriageStatus,
};

/// Adapter for storage and persistence backends.
///
/// The backend must provide at least read-committed consistency and an atomic
/// conditional update for [`claim_escalation`](StorageAdapter::claim_escalation):
/// exactly one of any number of concurrent claimers wins, the rest observe the
/// row already gone from the waiting pool.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ForYouError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ForYouError>;

    // --- Session operations ---

    async fn create_session(&self, session: &Session) -> Result<(), ForYouError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, ForYouError>;

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, ForYouError>;

    /// Persists the aggregator's updated risk fields. `initial` is only
    /// written when the stored initial level is still unset.
    async fn update_session_risk(
        &self,
        id: &str,
        initial: Option<RiskLevel>,
        current: RiskLevel,
    ) -> Result<(), ForYouError>;

    /// Increments the session's classification-warning counter.
    async fn record_classifier_warning(&self, id: &str) -> Result<(), ForYouError>;

    /// Closes an open session. Fails with `AlreadyResolved` when the session
    /// is already closed and `SessionUnavailable` when it does not exist.
    async fn close_session(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> Result<Session, ForYouError>;

    /// Binds a volunteer to the session and marks it transferred.
    async fn transfer_session(
        &self,
        id: &str,
        volunteer_id: &str,
    ) -> Result<(), ForYouError>;

    /// Active sessions whose last activity predates `cutoff`.
    async fn list_idle_sessions(&self, cutoff: &str) -> Result<Vec<Session>, ForYouError>;

    /// Redacts session, message, and triage content while preserving
    /// statuses, risk levels, and ordering for audit queries.
    async fn anonymize_session(&self, id: &str) -> Result<(), ForYouError>;

    // --- Message operations ---

    /// Inserts a message and, in the same transaction, bumps the owning
    /// session's message count and last-activity timestamp.
    async fn insert_message(&self, message: &Message) -> Result<(), ForYouError>;

    /// Stamps a message with its per-message risk tag after classification.
    async fn tag_message(&self, id: &str, tag: RiskLevel) -> Result<(), ForYouError>;

    /// Messages for a session in creation order, ties broken by insertion
    /// order. `limit`, when set, returns the most recent messages, still in
    /// chronological order.
    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ForYouError>;

    // --- Triage record operations ---

    /// Inserts a new triage record. The backend enforces at most one
    /// `offered` record per session and at most one record per triggering
    /// message; a violated guard surfaces as `AlreadyResolved`.
    async fn insert_triage(&self, record: &TriageRecord) -> Result<(), ForYouError>;

    async fn get_triage(&self, id: &str) -> Result<Option<TriageRecord>, ForYouError>;

    /// The session's record currently pending a decision, if any.
    async fn pending_triage(
        &self,
        session_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError>;

    /// The session's most recently created record, if any.
    async fn latest_triage(
        &self,
        session_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError>;

    /// All of a session's records in creation order (the triage history).
    async fn list_triage(&self, session_id: &str) -> Result<Vec<TriageRecord>, ForYouError>;

    /// Raises the risk level backing a still-pending offer when the
    /// session's risk escalates past it. Returns the updated record, or
    /// `None` when the record is no longer in `offered` state.
    async fn escalate_pending_triage(
        &self,
        id: &str,
        level: RiskLevel,
    ) -> Result<Option<TriageRecord>, ForYouError>;

    /// The record created by a specific triggering message, if any.
    async fn triage_for_trigger(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError>;

    /// Conditionally resolves a record: `offered -> accepted | declined`, or
    /// `accepted -> completed`. Any other combination is `InvalidTransition`;
    /// a record already at the target status is `AlreadyResolved`.
    async fn resolve_triage(
        &self,
        id: &str,
        status: TriageStatus,
        reason: Option<&str>,
    ) -> Result<TriageRecord, ForYouError>;

    // --- Escalation queue operations ---

    /// Inserts a waiting escalation request. At most one request may exist
    /// per triage record; on conflict the existing request is returned
    /// unchanged (exactly-once creation).
    async fn insert_escalation(
        &self,
        request: &EscalationRequest,
    ) -> Result<EscalationRequest, ForYouError>;

    async fn get_escalation(
        &self,
        id: &str,
    ) -> Result<Option<EscalationRequest>, ForYouError>;

    async fn escalation_for_triage(
        &self,
        triage_id: &str,
    ) -> Result<Option<EscalationRequest>, ForYouError>;

    /// Waiting requests ordered critical > high > normal, FIFO within a tier.
    async fn list_waiting_escalations(&self) -> Result<Vec<EscalationRequest>, ForYouError>;

    /// Atomically transitions `waiting -> active`, binding the volunteer.
    /// Exactly one concurrent claimer succeeds; the rest receive
    /// `ClaimConflict` (already active) or `AlreadyResolved` (completed).
    async fn claim_escalation(
        &self,
        id: &str,
        volunteer_id: &str,
    ) -> Result<EscalationRequest, ForYouError>;

    /// Compensating transition `active -> waiting` for a disconnected
    /// volunteer, clearing the binding and preserving queue position.
    async fn release_escalation(&self, id: &str) -> Result<EscalationRequest, ForYouError>;

    /// Transitions `active -> completed` when the 1:1 interaction ends.
    async fn complete_escalation(&self, id: &str) -> Result<EscalationRequest, ForYouError>;
}
