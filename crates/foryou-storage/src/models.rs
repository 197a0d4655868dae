// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and the core entity types.
//!
//! The canonical types are defined in `foryou-core::types` for use across
//! adapter trait boundaries. Statuses are stored as lowercase text and parsed
//! strictly on read; a row holding an unknown status is a storage error, not
//! a silent fallback.

use std::str::FromStr;

use rusqlite::Row;

pub use foryou_core::types::{EscalationRequest, Message, Session, TriageRecord};

pub(crate) const SESSION_COLUMNS: &str = "id, client_id, volunteer_id, status, \
     initial_risk_level, current_risk_level, message_count, classifier_warnings, \
     anonymized, started_at, last_activity_at, ended_at";

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, session_id, role, content, risk_tag, metadata, anonymized, created_at";

pub(crate) const TRIAGE_COLUMNS: &str = "id, session_id, risk_level, status, \
     trigger_message_id, decline_reason, anonymized, created_at, decided_at";

pub(crate) const ESCALATION_COLUMNS: &str = "id, session_id, triage_id, client_id, \
     priority, status, volunteer_id, created_at, claimed_at, completed_at";

/// Parse a stored text column into its enum, reporting a conversion failure
/// rusqlite understands.
pub(crate) fn decode<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn decode_opt<T>(idx: usize, value: Option<String>) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.map(|s| decode(idx, &s)).transpose()
}

pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        client_id: row.get(1)?,
        volunteer_id: row.get(2)?,
        status: decode(3, &row.get::<_, String>(3)?)?,
        initial_risk_level: decode_opt(4, row.get(4)?)?,
        current_risk_level: decode_opt(5, row.get(5)?)?,
        message_count: row.get(6)?,
        classifier_warnings: row.get(7)?,
        anonymized: row.get(8)?,
        started_at: row.get(9)?,
        last_activity_at: row.get(10)?,
        ended_at: row.get(11)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: decode(2, &row.get::<_, String>(2)?)?,
        content: row.get(3)?,
        risk_tag: decode_opt(4, row.get(4)?)?,
        metadata: row.get(5)?,
        anonymized: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn triage_from_row(row: &Row<'_>) -> rusqlite::Result<TriageRecord> {
    Ok(TriageRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        risk_level: decode(2, &row.get::<_, String>(2)?)?,
        status: decode(3, &row.get::<_, String>(3)?)?,
        trigger_message_id: row.get(4)?,
        decline_reason: row.get(5)?,
        anonymized: row.get(6)?,
        created_at: row.get(7)?,
        decided_at: row.get(8)?,
    })
}

pub(crate) fn escalation_from_row(row: &Row<'_>) -> rusqlite::Result<EscalationRequest> {
    Ok(EscalationRequest {
        id: row.get(0)?,
        session_id: row.get(1)?,
        triage_id: row.get(2)?,
        client_id: row.get(3)?,
        priority: decode(4, &row.get::<_, String>(4)?)?,
        status: decode(5, &row.get::<_, String>(5)?)?,
        volunteer_id: row.get(6)?,
        created_at: row.get(7)?,
        claimed_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}
