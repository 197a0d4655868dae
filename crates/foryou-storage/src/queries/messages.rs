// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.

use foryou_core::ForYouError;
use foryou_core::types::RiskLevel;
use rusqlite::params;

use crate::database::Database;
use crate::models::{MESSAGE_COLUMNS, Message, message_from_row};

/// Insert a message and, in the same transaction, bump the owning session's
/// message count and last-activity timestamp.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), ForYouError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, risk_tag,
                     metadata, anonymized, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.session_id,
                    message.role.to_string(),
                    message.content,
                    message.risk_tag.map(|l| l.to_string()),
                    message.metadata,
                    message.anonymized,
                    message.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE sessions
                 SET message_count = message_count + 1, last_activity_at = ?1
                 WHERE id = ?2",
                params![message.created_at, message.session_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp a message with its per-message risk tag after classification.
pub async fn tag_message(db: &Database, id: &str, tag: RiskLevel) -> Result<(), ForYouError> {
    let id = id.to_string();
    let tag = tag.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET risk_tag = ?1 WHERE id = ?2",
                params![tag, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages for a session in creation order, ties broken by insertion order.
///
/// With a limit, the most recent messages are returned, still chronological.
pub async fn get_messages(
    db: &Database,
    session_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, ForYouError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(n) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM (
                             SELECT {MESSAGE_COLUMNS}, rowid AS rid FROM messages
                             WHERE session_id = ?1
                             ORDER BY created_at DESC, rid DESC
                             LIMIT ?2
                         ) ORDER BY created_at ASC, rid ASC"
                    ))?;
                    let rows = stmt.query_map(params![session_id, n], message_from_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE session_id = ?1
                         ORDER BY created_at ASC, rowid ASC"
                    ))?;
                    let rows = stmt.query_map(params![session_id], message_from_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
