// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation queue operations.
//!
//! The claim is a single conditional update guarded by `status = 'waiting'`,
//! serialized through the single-writer connection: exactly one of any number
//! of concurrent claimers flips the row, the rest observe it already gone.

use foryou_core::ForYouError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ESCALATION_COLUMNS, EscalationRequest, escalation_from_row};

/// Ordering used for the waiting pool: priority tier first, then strict FIFO
/// by creation time within a tier.
const WAITING_ORDER: &str = "CASE priority
         WHEN 'critical' THEN 0
         WHEN 'high' THEN 1
         ELSE 2
     END, created_at ASC, rowid ASC";

enum InsertOutcome {
    Inserted,
    Existing(EscalationRequest),
}

/// Insert a waiting escalation request.
///
/// At most one request may exist per triage record (unique index); on
/// conflict the existing request is returned unchanged, giving callers
/// exactly-once creation.
pub async fn insert_escalation(
    db: &Database,
    request: &EscalationRequest,
) -> Result<EscalationRequest, ForYouError> {
    let request = request.clone();
    let returned = request.clone();
    let outcome = db
        .connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO escalations (id, session_id, triage_id, client_id,
                     priority, status, volunteer_id, created_at, claimed_at,
                     completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    request.id,
                    request.session_id,
                    request.triage_id,
                    request.client_id,
                    request.priority.to_string(),
                    request.status.to_string(),
                    request.volunteer_id,
                    request.created_at,
                    request.claimed_at,
                    request.completed_at,
                ],
            );
            match result {
                Ok(_) => Ok(InsertOutcome::Inserted),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    let existing = conn.query_row(
                        &format!(
                            "SELECT {ESCALATION_COLUMNS} FROM escalations
                             WHERE triage_id = ?1"
                        ),
                        params![request.triage_id],
                        escalation_from_row,
                    )?;
                    Ok(InsertOutcome::Existing(existing))
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        InsertOutcome::Inserted => Ok(returned),
        InsertOutcome::Existing(existing) => Ok(existing),
    }
}

/// Get an escalation request by ID.
pub async fn get_escalation(
    db: &Database,
    id: &str,
) -> Result<Option<EscalationRequest>, ForYouError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ESCALATION_COLUMNS} FROM escalations WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], escalation_from_row) {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The escalation request derived from a triage record, if any.
pub async fn escalation_for_triage(
    db: &Database,
    triage_id: &str,
) -> Result<Option<EscalationRequest>, ForYouError> {
    let triage_id = triage_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ESCALATION_COLUMNS} FROM escalations WHERE triage_id = ?1"
            ))?;
            match stmt.query_row(params![triage_id], escalation_from_row) {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Waiting requests in service order: critical > high > normal, FIFO within
/// a tier.
pub async fn list_waiting_escalations(
    db: &Database,
) -> Result<Vec<EscalationRequest>, ForYouError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ESCALATION_COLUMNS} FROM escalations
                 WHERE status = 'waiting'
                 ORDER BY {WAITING_ORDER}"
            ))?;
            let rows = stmt.query_map([], escalation_from_row)?;
            let mut requests = Vec::new();
            for row in rows {
                requests.push(row?);
            }
            Ok(requests)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

enum TransitionOutcome {
    Done(EscalationRequest),
    Missing,
    Lost(String),
}

async fn guarded_transition(
    db: &Database,
    id: &str,
    sql: &'static str,
    volunteer: Option<String>,
) -> Result<TransitionOutcome, ForYouError> {
    let id_owned = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = match &volunteer {
                Some(v) => tx.execute(sql, params![v, id_owned])?,
                None => tx.execute(sql, params![id_owned])?,
            };
            let outcome = if changed == 1 {
                let request = tx.query_row(
                    &format!("SELECT {ESCALATION_COLUMNS} FROM escalations WHERE id = ?1"),
                    params![id_owned],
                    escalation_from_row,
                )?;
                TransitionOutcome::Done(request)
            } else {
                match tx.query_row(
                    "SELECT status FROM escalations WHERE id = ?1",
                    params![id_owned],
                    |row| row.get::<_, String>(0),
                ) {
                    Ok(current) => TransitionOutcome::Lost(current),
                    Err(rusqlite::Error::QueryReturnedNoRows) => TransitionOutcome::Missing,
                    Err(e) => return Err(e),
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically transition `waiting -> active`, binding the volunteer.
///
/// Exactly one concurrent claimer succeeds. A claim on an already-active
/// request is `ClaimConflict`; on a completed one, `AlreadyResolved`.
pub async fn claim_escalation(
    db: &Database,
    id: &str,
    volunteer_id: &str,
) -> Result<EscalationRequest, ForYouError> {
    let outcome = guarded_transition(
        db,
        id,
        "UPDATE escalations
         SET status = 'active', volunteer_id = ?1,
             claimed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?2 AND status = 'waiting'",
        Some(volunteer_id.to_string()),
    )
    .await?;

    match outcome {
        TransitionOutcome::Done(request) => Ok(request),
        TransitionOutcome::Missing => Err(ForYouError::NotFound {
            entity: "escalation",
            id: id.to_string(),
        }),
        TransitionOutcome::Lost(current) if current == "completed" => {
            Err(ForYouError::AlreadyResolved {
                entity: "escalation",
                id: id.to_string(),
                status: current,
            })
        }
        TransitionOutcome::Lost(_) => Err(ForYouError::ClaimConflict {
            escalation_id: id.to_string(),
        }),
    }
}

/// Compensating transition `active -> waiting` for a disconnected volunteer.
///
/// Clears the binding; `created_at` is untouched so the request keeps its
/// FIFO position within its priority tier.
pub async fn release_escalation(
    db: &Database,
    id: &str,
) -> Result<EscalationRequest, ForYouError> {
    let outcome = guarded_transition(
        db,
        id,
        "UPDATE escalations
         SET status = 'waiting', volunteer_id = NULL, claimed_at = NULL
         WHERE id = ?1 AND status = 'active'",
        None,
    )
    .await?;

    match outcome {
        TransitionOutcome::Done(request) => Ok(request),
        TransitionOutcome::Missing => Err(ForYouError::NotFound {
            entity: "escalation",
            id: id.to_string(),
        }),
        TransitionOutcome::Lost(current) => Err(ForYouError::AlreadyResolved {
            entity: "escalation",
            id: id.to_string(),
            status: current,
        }),
    }
}

/// Transition `active -> completed` when the 1:1 interaction ends.
pub async fn complete_escalation(
    db: &Database,
    id: &str,
) -> Result<EscalationRequest, ForYouError> {
    let outcome = guarded_transition(
        db,
        id,
        "UPDATE escalations
         SET status = 'completed',
             completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'active'",
        None,
    )
    .await?;

    match outcome {
        TransitionOutcome::Done(request) => Ok(request),
        TransitionOutcome::Missing => Err(ForYouError::NotFound {
            entity: "escalation",
            id: id.to_string(),
        }),
        TransitionOutcome::Lost(current) if current == "completed" => {
            Err(ForYouError::AlreadyResolved {
                entity: "escalation",
                id: id.to_string(),
                status: current,
            })
        }
        TransitionOutcome::Lost(current) => Err(ForYouError::InvalidTransition {
            entity: "escalation",
            id: id.to_string(),
            from: current,
            to: "completed".to_string(),
        }),
    }
}
