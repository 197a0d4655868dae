// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The triage state machine.
//!
//! A session's triage sub-state is derived from its stored records, not held
//! as a separate enum: `NONE` (no pending record) -> `OFFERED` (one record
//! pending a decision) -> `ACCEPTED`/`DECLINED` -> `NONE` again, with
//! acceptance synchronously producing an escalation request. Guards:
//! at most one pending offer per session, at most one record per triggering
//! message, and no re-offer after a decline until risk rises strictly above
//! the level recorded at decline time.

use std::sync::Arc;

use tracing::{debug, info};

use foryou_bus::{EventBus, TriageEvent};
use foryou_core::types::{
    EscalationRequest, RiskLevel, Session, TriageRecord, TriageStatus, now_rfc3339,
};
use foryou_core::{ForYouError, StorageAdapter};

use crate::handoff::EscalationHandoff;

/// What the state machine decided for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum TriageDisposition {
    /// Risk below the offer threshold, or a decline is still standing.
    NoAction,
    /// A new offer was created by this message.
    Offered(TriageRecord),
    /// An earlier offer is still awaiting the client's decision.
    OfferPending(TriageRecord),
    /// This message already produced a record (idempotent re-delivery).
    AlreadyEvaluated(TriageRecord),
}

/// Per-session triage transitions, with acceptance wired synchronously into
/// the escalation hand-off.
pub struct TriageMachine {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    bus: EventBus,
    handoff: EscalationHandoff,
}

impl TriageMachine {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, bus: EventBus) -> Self {
        let handoff = EscalationHandoff::new(storage.clone(), bus.clone());
        Self {
            storage,
            bus,
            handoff,
        }
    }

    fn require_open(session: &Session) -> Result<(), ForYouError> {
        if session.status.is_open() {
            Ok(())
        } else {
            Err(ForYouError::SessionUnavailable {
                session_id: session.id.clone(),
                reason: format!("session is {}", session.status),
            })
        }
    }

    /// Decide whether this message's updated session risk level should
    /// create a new offer.
    pub async fn evaluate_message(
        &self,
        session: &Session,
        message_id: &str,
        level: RiskLevel,
    ) -> Result<TriageDisposition, ForYouError> {
        Self::require_open(session)?;

        if !level.is_elevated() {
            return Ok(TriageDisposition::NoAction);
        }

        // Idempotent per message: re-delivery never creates a second record.
        if let Some(existing) = self
            .storage
            .triage_for_trigger(&session.id, message_id)
            .await?
        {
            return Ok(TriageDisposition::AlreadyEvaluated(existing));
        }

        // At most one pending offer per session at a time. While an offer is
        // pending it is not yet immutable history: escalating risk raises the
        // level it carries, so a later acceptance hands off at the severity
        // the session actually reached.
        if let Some(pending) = self.storage.pending_triage(&session.id).await? {
            if level > pending.risk_level
                && let Some(updated) = self
                    .storage
                    .escalate_pending_triage(&pending.id, level)
                    .await?
            {
                info!(
                    session_id = %session.id,
                    triage_id = %updated.id,
                    risk_level = %level,
                    "pending offer raised to the session's new risk level"
                );
                return Ok(TriageDisposition::OfferPending(updated));
            }
            return Ok(TriageDisposition::OfferPending(pending));
        }

        // After a decline, only a strictly higher risk level re-opens the
        // automatic offer.
        if let Some(last) = self.storage.latest_triage(&session.id).await?
            && last.status == TriageStatus::Declined
            && level <= last.risk_level
        {
            debug!(
                session_id = %session.id,
                declined_at_level = %last.risk_level,
                level = %level,
                "decline standing, not re-offering"
            );
            return Ok(TriageDisposition::NoAction);
        }

        let record = TriageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            risk_level: level,
            status: TriageStatus::Offered,
            trigger_message_id: Some(message_id.to_string()),
            decline_reason: None,
            anonymized: false,
            created_at: now_rfc3339(),
            decided_at: None,
        };

        match self.storage.insert_triage(&record).await {
            Ok(()) => {
                info!(
                    session_id = %session.id,
                    triage_id = %record.id,
                    risk_level = %level,
                    "triage offer created"
                );
                self.bus.publish(TriageEvent::TriageOffered {
                    session_id: session.id.clone(),
                    triage_id: record.id.clone(),
                    risk_level: level,
                });
                Ok(TriageDisposition::Offered(record))
            }
            // A concurrent caller won the insert; surface whichever record
            // now guards the session.
            Err(ForYouError::AlreadyResolved { .. }) => {
                if let Some(pending) = self.storage.pending_triage(&session.id).await? {
                    Ok(TriageDisposition::OfferPending(pending))
                } else if let Some(existing) = self
                    .storage
                    .triage_for_trigger(&session.id, message_id)
                    .await?
                {
                    Ok(TriageDisposition::AlreadyEvaluated(existing))
                } else {
                    Err(ForYouError::Internal(format!(
                        "offer guard fired for session {} but no guarding record found",
                        session.id
                    )))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Explicit client affirmation of the pending offer. Acceptance
    /// synchronously creates exactly one escalation request.
    pub async fn accept(
        &self,
        session: &Session,
        triage_id: &str,
        emergency: bool,
    ) -> Result<(TriageRecord, EscalationRequest), ForYouError> {
        Self::require_open(session)?;
        self.require_owned(session, triage_id).await?;

        let record = self
            .storage
            .resolve_triage(triage_id, TriageStatus::Accepted, None)
            .await?;
        info!(
            session_id = %session.id,
            triage_id = %record.id,
            "triage offer accepted"
        );
        self.bus.publish(TriageEvent::TriageAccepted {
            session_id: session.id.clone(),
            triage_id: record.id.clone(),
        });

        let escalation = self.handoff.create_escalation(&record, emergency).await?;
        Ok((record, escalation))
    }

    /// Explicit client refusal, with an optional free-text reason retained
    /// to avoid re-prompting immediately afterwards.
    pub async fn decline(
        &self,
        session: &Session,
        triage_id: &str,
        reason: Option<&str>,
    ) -> Result<TriageRecord, ForYouError> {
        Self::require_open(session)?;
        self.require_owned(session, triage_id).await?;

        let record = self
            .storage
            .resolve_triage(triage_id, TriageStatus::Declined, reason)
            .await?;
        info!(
            session_id = %session.id,
            triage_id = %record.id,
            "triage offer declined"
        );
        self.bus.publish(TriageEvent::TriageDeclined {
            session_id: session.id.clone(),
            triage_id: record.id.clone(),
            reason: record.decline_reason.clone(),
        });
        Ok(record)
    }

    /// The client proactively asks for a human. An explicit ask overrides
    /// the need for a system-initiated offer and is honored even while a
    /// decline is standing.
    ///
    /// Accepts the pending offer when one exists; otherwise creates a record
    /// already marked accepted in the same operation, then hands off.
    pub async fn request_human(
        &self,
        session: &Session,
        trigger_message_id: Option<&str>,
        emergency: bool,
    ) -> Result<(TriageRecord, EscalationRequest), ForYouError> {
        Self::require_open(session)?;

        if let Some(pending) = self.storage.pending_triage(&session.id).await? {
            debug!(
                session_id = %session.id,
                triage_id = %pending.id,
                "explicit ask accepts the pending offer"
            );
            return self.accept(session, &pending.id, emergency).await;
        }

        let level = session.current_risk_level.unwrap_or(RiskLevel::Low);
        let now = now_rfc3339();
        let record = TriageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            risk_level: level,
            status: TriageStatus::Accepted,
            trigger_message_id: trigger_message_id.map(str::to_string),
            decline_reason: None,
            anonymized: false,
            created_at: now.clone(),
            decided_at: Some(now),
        };

        let record = match self.storage.insert_triage(&record).await {
            Ok(()) => record,
            // Re-delivery of the same triggering message: reuse its record.
            Err(ForYouError::AlreadyResolved { .. }) => {
                if let Some(message_id) = trigger_message_id
                    && let Some(existing) = self
                        .storage
                        .triage_for_trigger(&session.id, message_id)
                        .await?
                {
                    existing
                } else {
                    return Err(ForYouError::Internal(format!(
                        "request guard fired for session {} but no guarding record found",
                        session.id
                    )));
                }
            }
            Err(e) => return Err(e),
        };

        info!(
            session_id = %session.id,
            triage_id = %record.id,
            "client requested escalation directly"
        );
        self.bus.publish(TriageEvent::TriageAccepted {
            session_id: session.id.clone(),
            triage_id: record.id.clone(),
        });

        let escalation = self.handoff.create_escalation(&record, emergency).await?;
        Ok((record, escalation))
    }

    async fn require_owned(
        &self,
        session: &Session,
        triage_id: &str,
    ) -> Result<(), ForYouError> {
        let record = self
            .storage
            .get_triage(triage_id)
            .await?
            .ok_or_else(|| ForYouError::NotFound {
                entity: "triage record",
                id: triage_id.to_string(),
            })?;
        if record.session_id != session.id {
            return Err(ForYouError::NotFound {
                entity: "triage record",
                id: triage_id.to_string(),
            });
        }
        Ok(())
    }
}
