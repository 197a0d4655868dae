// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the ForYou triage core.
//!
//! Every status is a closed enum with a lowercase wire form (via strum), so
//! invalid states are unrepresentable in process and the database stores
//! stable, human-readable text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Returns the current UTC time as an RFC 3339 string with millisecond
/// precision and a `Z` suffix.
///
/// All timestamps in storage use this exact shape so that lexicographic
/// comparison in SQL matches chronological order.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Coarse ordinal severity of the emotional-risk signal in a message or
/// session. Ordering is by severity: `Low < Moderate < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
    Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Whether this level is high enough to trigger a triage offer.
    pub fn is_elevated(self) -> bool {
        self >= RiskLevel::Moderate
    }

    /// The next level down, saturating at `Low`.
    pub fn step_down(self) -> RiskLevel {
        match self {
            RiskLevel::Critical => RiskLevel::High,
            RiskLevel::High => RiskLevel::Moderate,
            RiskLevel::Moderate | RiskLevel::Low => RiskLevel::Low,
        }
    }
}

/// Lifecycle status of a support conversation session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Client and AI are conversing.
    Active,
    /// Closed by explicit client or volunteer action.
    Completed,
    /// Closed by the inactivity sweeper.
    Abandoned,
    /// Handed off to a volunteer.
    Transferred,
}

impl SessionStatus {
    /// Whether the session can still receive messages and triage transitions.
    pub fn is_open(self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Transferred)
    }
}

/// Author role of a message within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
    Volunteer,
    System,
}

/// Status of one offer-and-decision triage episode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TriageStatus {
    /// Pending the client's decision.
    Offered,
    /// Client agreed to be forwarded to a volunteer.
    Accepted,
    /// Client refused; the optional reason is retained.
    Declined,
    /// The resulting hand-off finished.
    Completed,
}

/// Service priority of an escalation request. Ordering is by urgency:
/// `Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
    Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscalationPriority {
    Normal,
    High,
    Critical,
}

/// Lifecycle status of an escalation request in the volunteer queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    /// In the claimable pool.
    Waiting,
    /// Claimed by exactly one volunteer.
    Active,
    /// The 1:1 interaction ended.
    Completed,
}

/// Identifies the type of adapter behind a collaborator seam.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Classifier,
    Storage,
    Directory,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Wire-level classifier output: a risk tag string plus a confidence in 0..1.
///
/// The tag is a free string at this boundary so that external classifiers can
/// be swapped in without a type dependency; the core parses it leniently and
/// records a warning for unrecognized tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClassification {
    pub tag: String,
    pub confidence: f64,
}

/// One continuous support conversation between a client and the AI/volunteer
/// system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique id (UUID), distinct from any storage rowid.
    pub id: String,
    pub client_id: String,
    /// Set when the session is transferred to a volunteer.
    pub volunteer_id: Option<String>,
    pub status: SessionStatus,
    /// Set once, on the first classified message; never changes afterward.
    pub initial_risk_level: Option<RiskLevel>,
    /// Running risk level maintained by the risk aggregator.
    pub current_risk_level: Option<RiskLevel>,
    pub message_count: i64,
    /// Number of classification warnings and failures recorded on this session.
    pub classifier_warnings: i64,
    pub anonymized: bool,
    pub started_at: String,
    pub last_activity_at: String,
    pub ended_at: Option<String>,
}

/// One message within a session, owned exclusively by that session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Per-message risk tag, filled in after classification.
    pub risk_tag: Option<RiskLevel>,
    /// Optional free-form analysis metadata (JSON).
    pub metadata: Option<String>,
    pub anonymized: bool,
    pub created_at: String,
}

/// One offer-and-decision triage episode within a session.
///
/// Never deleted (audit trail); content may be redacted by anonymization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: String,
    pub session_id: String,
    /// Session risk level at the time the record was created.
    pub risk_level: RiskLevel,
    pub status: TriageStatus,
    /// The message that triggered the offer, when system-initiated.
    pub trigger_message_id: Option<String>,
    /// Free-text reason retained when the client declines.
    pub decline_reason: Option<String>,
    pub anonymized: bool,
    pub created_at: String,
    pub decided_at: Option<String>,
}

/// A queued request for volunteer handling, derived from an accepted triage
/// record. References its session; does not own it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRequest {
    pub id: String,
    pub session_id: String,
    pub triage_id: String,
    pub client_id: String,
    pub priority: EscalationPriority,
    pub status: EscalationStatus,
    /// The single volunteer bound by a successful claim.
    pub volunteer_id: Option<String>,
    pub created_at: String,
    pub claimed_at: Option<String>,
    pub completed_at: Option<String>,
}
