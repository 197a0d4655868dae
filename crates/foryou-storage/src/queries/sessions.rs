// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD and lifecycle operations.

use foryou_core::ForYouError;
use foryou_core::types::{RiskLevel, SessionStatus};
use rusqlite::params;

use crate::database::Database;
use crate::models::{SESSION_COLUMNS, Session, session_from_row};

/// Create a new session.
pub async fn create_session(db: &Database, session: &Session) -> Result<(), ForYouError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, client_id, volunteer_id, status,
                     initial_risk_level, current_risk_level, message_count,
                     classifier_warnings, anonymized, started_at, last_activity_at,
                     ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    session.id,
                    session.client_id,
                    session.volunteer_id,
                    session.status.to_string(),
                    session.initial_risk_level.map(|l| l.to_string()),
                    session.current_risk_level.map(|l| l.to_string()),
                    session.message_count,
                    session.classifier_warnings,
                    session.anonymized,
                    session.started_at,
                    session.last_activity_at,
                    session.ended_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, ForYouError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], session_from_row);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List sessions, optionally filtered by status, newest first.
pub async fn list_sessions(
    db: &Database,
    status: Option<SessionStatus>,
) -> Result<Vec<Session>, ForYouError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut sessions = Vec::new();
            match &status {
                Some(filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions
                         WHERE status = ?1 ORDER BY started_at DESC"
                    ))?;
                    let rows = stmt.query_map(params![filter], session_from_row)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC"
                    ))?;
                    let rows = stmt.query_map([], session_from_row)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the aggregator's updated risk fields.
///
/// The initial level is only written when still unset (set-once semantics
/// live in the COALESCE).
pub async fn update_session_risk(
    db: &Database,
    id: &str,
    initial: Option<RiskLevel>,
    current: RiskLevel,
) -> Result<(), ForYouError> {
    let id = id.to_string();
    let initial = initial.map(|l| l.to_string());
    let current = current.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET current_risk_level = ?1,
                     initial_risk_level = COALESCE(initial_risk_level, ?2)
                 WHERE id = ?3",
                params![current, initial, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Increment the session's classification-warning counter.
pub async fn record_classifier_warning(db: &Database, id: &str) -> Result<(), ForYouError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET classifier_warnings = classifier_warnings + 1
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

enum CloseOutcome {
    Closed(Session),
    Missing,
    Already(String),
}

/// Close an open session, stamping `ended_at`.
pub async fn close_session(
    db: &Database,
    id: &str,
    status: SessionStatus,
) -> Result<Session, ForYouError> {
    let id_owned = id.to_string();
    let status_str = status.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status IN ('active', 'transferred')",
                params![status_str, id_owned],
            )?;
            let outcome = if changed == 1 {
                let session = tx.query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                    params![id_owned],
                    session_from_row,
                )?;
                CloseOutcome::Closed(session)
            } else {
                match tx.query_row(
                    "SELECT status FROM sessions WHERE id = ?1",
                    params![id_owned],
                    |row| row.get::<_, String>(0),
                ) {
                    Ok(current) => CloseOutcome::Already(current),
                    Err(rusqlite::Error::QueryReturnedNoRows) => CloseOutcome::Missing,
                    Err(e) => return Err(e),
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        CloseOutcome::Closed(session) => Ok(session),
        CloseOutcome::Missing => Err(ForYouError::SessionUnavailable {
            session_id: id.to_string(),
            reason: "session does not exist".to_string(),
        }),
        CloseOutcome::Already(current) => Err(ForYouError::AlreadyResolved {
            entity: "session",
            id: id.to_string(),
            status: current,
        }),
    }
}

/// Bind a volunteer to the session and mark it transferred.
pub async fn transfer_session(
    db: &Database,
    id: &str,
    volunteer_id: &str,
) -> Result<(), ForYouError> {
    let id_owned = id.to_string();
    let volunteer = volunteer_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            Ok(conn.execute(
                "UPDATE sessions SET volunteer_id = ?1, status = 'transferred'
                 WHERE id = ?2 AND status IN ('active', 'transferred')",
                params![volunteer, id_owned],
            )?)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if changed == 1 {
        Ok(())
    } else {
        Err(ForYouError::SessionUnavailable {
            session_id: id.to_string(),
            reason: "session is missing or already closed".to_string(),
        })
    }
}

/// Active sessions whose last activity predates `cutoff`, oldest first.
pub async fn list_idle_sessions(db: &Database, cutoff: &str) -> Result<Vec<Session>, ForYouError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'active' AND last_activity_at < ?1
                 ORDER BY last_activity_at ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], session_from_row)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Redact session, message, and triage content while preserving statuses,
/// risk levels, and ordering.
pub async fn anonymize_session(db: &Database, id: &str) -> Result<(), ForYouError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE sessions SET anonymized = 1 WHERE id = ?1",
                params![id],
            )?;
            tx.execute(
                "UPDATE messages
                 SET content = CASE role
                         WHEN 'user' THEN '[user content removed for privacy]'
                         WHEN 'volunteer' THEN '[volunteer content removed for privacy]'
                         ELSE content
                     END,
                     metadata = NULL,
                     anonymized = 1
                 WHERE session_id = ?1",
                params![id],
            )?;
            tx.execute(
                "UPDATE triage_records
                 SET decline_reason = CASE
                         WHEN decline_reason IS NULL THEN NULL
                         ELSE '[reason removed for privacy]'
                     END,
                     anonymized = 1
                 WHERE session_id = ?1",
                params![id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_session, setup_db};
    use foryou_core::types::now_rfc3339;

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let (db, _dir) = setup_db().await;
        let session = make_session("sess-1", "client-1");

        create_session(&db, &session).await.unwrap();
        let retrieved = get_session(&db, "sess-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "sess-1");
        assert_eq!(retrieved.client_id, "client-1");
        assert_eq!(retrieved.status, SessionStatus::Active);
        assert_eq!(retrieved.current_risk_level, None);
        assert_eq!(retrieved.message_count, 0);
    }

    #[tokio::test]
    async fn get_nonexistent_session_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_session(&db, "no-such-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_sessions_with_filter() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();
        create_session(&db, &make_session("s2", "c2")).await.unwrap();
        close_session(&db, "s2", SessionStatus::Completed).await.unwrap();

        let all = list_sessions(&db, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let active = list_sessions(&db, Some(SessionStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "s1");

        let completed = list_sessions(&db, Some(SessionStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "s2");
    }

    #[tokio::test]
    async fn initial_risk_level_is_set_once() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();

        update_session_risk(&db, "s1", Some(RiskLevel::Moderate), RiskLevel::Moderate)
            .await
            .unwrap();
        update_session_risk(&db, "s1", Some(RiskLevel::Critical), RiskLevel::Critical)
            .await
            .unwrap();

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.initial_risk_level, Some(RiskLevel::Moderate));
        assert_eq!(session.current_risk_level, Some(RiskLevel::Critical));
    }

    #[tokio::test]
    async fn classifier_warnings_accumulate() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();
        record_classifier_warning(&db, "s1").await.unwrap();
        record_classifier_warning(&db, "s1").await.unwrap();
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.classifier_warnings, 2);
    }

    #[tokio::test]
    async fn close_session_is_terminal() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();

        let closed = close_session(&db, "s1", SessionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Completed);
        assert!(closed.ended_at.is_some());

        let err = close_session(&db, "s1", SessionStatus::Abandoned)
            .await
            .unwrap_err();
        assert!(matches!(err, ForYouError::AlreadyResolved { .. }));
    }

    #[tokio::test]
    async fn close_missing_session_is_unavailable() {
        let (db, _dir) = setup_db().await;
        let err = close_session(&db, "ghost", SessionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ForYouError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn transfer_binds_volunteer() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();

        transfer_session(&db, "s1", "vol-7").await.unwrap();
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Transferred);
        assert_eq!(session.volunteer_id.as_deref(), Some("vol-7"));
    }

    #[tokio::test]
    async fn transfer_closed_session_fails() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();
        close_session(&db, "s1", SessionStatus::Completed).await.unwrap();

        let err = transfer_session(&db, "s1", "vol-7").await.unwrap_err();
        assert!(matches!(err, ForYouError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn idle_listing_respects_cutoff() {
        let (db, _dir) = setup_db().await;
        let mut stale = make_session("stale", "c1");
        stale.last_activity_at = "2026-01-01T00:00:00.000Z".to_string();
        create_session(&db, &stale).await.unwrap();

        let mut fresh = make_session("fresh", "c2");
        fresh.last_activity_at = now_rfc3339();
        create_session(&db, &fresh).await.unwrap();

        let idle = list_idle_sessions(&db, "2026-06-01T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].id, "stale");
    }

    #[tokio::test]
    async fn anonymize_redacts_but_preserves_structure() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "c1")).await.unwrap();
        let msg = crate::test_support::make_message("m1", "s1", "I feel terrible");
        crate::queries::messages::insert_message(&db, &msg).await.unwrap();

        anonymize_session(&db, "s1").await.unwrap();

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert!(session.anonymized);
        assert_eq!(session.message_count, 1);

        let messages = crate::queries::messages::get_messages(&db, "s1", None)
            .await
            .unwrap();
        assert_eq!(messages[0].content, "[user content removed for privacy]");
        assert!(messages[0].anonymized);
    }
}
