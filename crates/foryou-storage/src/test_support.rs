// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the storage test suites.

use foryou_core::types::{
    EscalationPriority, EscalationRequest, EscalationStatus, Message, MessageRole,
    RiskLevel, Session, SessionStatus, TriageRecord, TriageStatus, now_rfc3339,
};

use crate::database::Database;

pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
    (db, dir)
}

pub(crate) fn make_session(id: &str, client_id: &str) -> Session {
    let now = now_rfc3339();
    Session {
        id: id.to_string(),
        client_id: client_id.to_string(),
        volunteer_id: None,
        status: SessionStatus::Active,
        initial_risk_level: None,
        current_risk_level: None,
        message_count: 0,
        classifier_warnings: 0,
        anonymized: false,
        started_at: now.clone(),
        last_activity_at: now,
        ended_at: None,
    }
}

pub(crate) fn make_message(id: &str, session_id: &str, content: &str) -> Message {
    Message {
        id: id.to_string(),
        session_id: session_id.to_string(),
        role: MessageRole::User,
        content: content.to_string(),
        risk_tag: None,
        metadata: None,
        anonymized: false,
        created_at: now_rfc3339(),
    }
}

pub(crate) fn make_triage(id: &str, session_id: &str, level: RiskLevel) -> TriageRecord {
    TriageRecord {
        id: id.to_string(),
        session_id: session_id.to_string(),
        risk_level: level,
        status: TriageStatus::Offered,
        trigger_message_id: None,
        decline_reason: None,
        anonymized: false,
        created_at: now_rfc3339(),
        decided_at: None,
    }
}

pub(crate) fn make_escalation(
    id: &str,
    session_id: &str,
    triage_id: &str,
    priority: EscalationPriority,
) -> EscalationRequest {
    EscalationRequest {
        id: id.to_string(),
        session_id: session_id.to_string(),
        triage_id: triage_id.to_string(),
        client_id: "client-1".to_string(),
        priority,
        status: EscalationStatus::Waiting,
        volunteer_id: None,
        created_at: now_rfc3339(),
        claimed_at: None,
        completed_at: None,
    }
}
