// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Triage record operations.
//!
//! Records are append-only audit history: they are inserted as `offered` (or
//! directly `accepted` for explicit client requests), resolved through
//! guarded conditional updates, and never deleted.

use foryou_core::ForYouError;
use foryou_core::types::TriageStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{TRIAGE_COLUMNS, TriageRecord, triage_from_row};

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Insert a new triage record.
///
/// The partial unique indexes enforce at most one `offered` record per
/// session and at most one record per triggering message; a violated guard
/// surfaces as `AlreadyResolved` so racing callers can re-read the pending
/// record instead of crashing.
pub async fn insert_triage(db: &Database, record: &TriageRecord) -> Result<(), ForYouError> {
    let record = record.clone();
    let session_id = record.session_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO triage_records (id, session_id, risk_level, status,
                     trigger_message_id, decline_reason, anonymized, created_at,
                     decided_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.session_id,
                    record.risk_level.to_string(),
                    record.status.to_string(),
                    record.trigger_message_id,
                    record.decline_reason,
                    record.anonymized,
                    record.created_at,
                    record.decided_at,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(ForYouError::AlreadyResolved {
            entity: "triage offer",
            id: session_id,
            status: TriageStatus::Offered.to_string(),
        })
    }
}

/// Get a triage record by ID.
pub async fn get_triage(db: &Database, id: &str) -> Result<Option<TriageRecord>, ForYouError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIAGE_COLUMNS} FROM triage_records WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], triage_from_row) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The session's record currently pending a decision, if any.
pub async fn pending_triage(
    db: &Database,
    session_id: &str,
) -> Result<Option<TriageRecord>, ForYouError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIAGE_COLUMNS} FROM triage_records
                 WHERE session_id = ?1 AND status = 'offered'"
            ))?;
            match stmt.query_row(params![session_id], triage_from_row) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The session's most recently created record, if any.
pub async fn latest_triage(
    db: &Database,
    session_id: &str,
) -> Result<Option<TriageRecord>, ForYouError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIAGE_COLUMNS} FROM triage_records
                 WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![session_id], triage_from_row) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All of a session's records in creation order (the triage history).
pub async fn list_triage(
    db: &Database,
    session_id: &str,
) -> Result<Vec<TriageRecord>, ForYouError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIAGE_COLUMNS} FROM triage_records
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![session_id], triage_from_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Raise the risk level backing a still-pending offer.
///
/// The guard on `status = 'offered'` keeps decided records immutable; a
/// record resolved concurrently is reported as `None`, not overwritten.
pub async fn escalate_pending_triage(
    db: &Database,
    id: &str,
    level: foryou_core::types::RiskLevel,
) -> Result<Option<TriageRecord>, ForYouError> {
    let id = id.to_string();
    let level = level.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE triage_records SET risk_level = ?1
                 WHERE id = ?2 AND status = 'offered'",
                params![level, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let record = conn.query_row(
                &format!("SELECT {TRIAGE_COLUMNS} FROM triage_records WHERE id = ?1"),
                params![id],
                triage_from_row,
            )?;
            Ok(Some(record))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The record created by a specific triggering message, if any.
pub async fn triage_for_trigger(
    db: &Database,
    session_id: &str,
    message_id: &str,
) -> Result<Option<TriageRecord>, ForYouError> {
    let session_id = session_id.to_string();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIAGE_COLUMNS} FROM triage_records
                 WHERE session_id = ?1 AND trigger_message_id = ?2"
            ))?;
            match stmt.query_row(params![session_id, message_id], triage_from_row) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

enum ResolveOutcome {
    Resolved(TriageRecord),
    Missing,
    Already(String),
    Invalid(String),
}

/// Conditionally resolve a record: `offered -> accepted | declined`, or
/// `accepted -> completed`.
pub async fn resolve_triage(
    db: &Database,
    id: &str,
    status: TriageStatus,
    reason: Option<&str>,
) -> Result<TriageRecord, ForYouError> {
    // `offered` is an initial state, never a resolution target.
    let expected_from = match status {
        TriageStatus::Accepted | TriageStatus::Declined => TriageStatus::Offered,
        TriageStatus::Completed => TriageStatus::Accepted,
        TriageStatus::Offered => {
            return Err(ForYouError::InvalidTransition {
                entity: "triage record",
                id: id.to_string(),
                from: "any".to_string(),
                to: TriageStatus::Offered.to_string(),
            });
        }
    };

    let id_owned = id.to_string();
    let status_str = status.to_string();
    let expected_str = expected_from.to_string();
    let reason = reason.map(|r| r.to_string());
    let is_decision = status != TriageStatus::Completed;

    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = if is_decision {
                tx.execute(
                    "UPDATE triage_records
                     SET status = ?1, decline_reason = ?2,
                         decided_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3 AND status = ?4",
                    params![status_str, reason, id_owned, expected_str],
                )?
            } else {
                tx.execute(
                    "UPDATE triage_records SET status = ?1
                     WHERE id = ?2 AND status = ?3",
                    params![status_str, id_owned, expected_str],
                )?
            };
            let outcome = if changed == 1 {
                let record = tx.query_row(
                    &format!("SELECT {TRIAGE_COLUMNS} FROM triage_records WHERE id = ?1"),
                    params![id_owned],
                    triage_from_row,
                )?;
                ResolveOutcome::Resolved(record)
            } else {
                match tx.query_row(
                    "SELECT status FROM triage_records WHERE id = ?1",
                    params![id_owned],
                    |row| row.get::<_, String>(0),
                ) {
                    Ok(current) if current == status_str => ResolveOutcome::Already(current),
                    Ok(current) => ResolveOutcome::Invalid(current),
                    Err(rusqlite::Error::QueryReturnedNoRows) => ResolveOutcome::Missing,
                    Err(e) => return Err(e),
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        ResolveOutcome::Resolved(record) => Ok(record),
        ResolveOutcome::Missing => Err(ForYouError::NotFound {
            entity: "triage record",
            id: id.to_string(),
        }),
        ResolveOutcome::Already(current) => Err(ForYouError::AlreadyResolved {
            entity: "triage record",
            id: id.to_string(),
            status: current,
        }),
        ResolveOutcome::Invalid(current) => Err(ForYouError::InvalidTransition {
            entity: "triage record",
            id: id.to_string(),
            from: current,
            to: status.to_string(),
        }),
    }
}
