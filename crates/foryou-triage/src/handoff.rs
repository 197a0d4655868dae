// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation hand-off: materializing an accepted triage record into a
//! durable escalation request on the volunteer queue.

use std::sync::Arc;

use tracing::{debug, info};

use foryou_bus::{EventBus, TriageEvent};
use foryou_core::types::{
    EscalationPriority, EscalationRequest, EscalationStatus, RiskLevel, TriageRecord,
    TriageStatus, now_rfc3339,
};
use foryou_core::{ForYouError, StorageAdapter};

/// Priority assigned to an escalation, derived from the risk level at
/// acceptance time. An explicit emergency flag on the triggering context
/// always maps to critical.
fn map_priority(level: RiskLevel, emergency: bool) -> EscalationPriority {
    if emergency || level == RiskLevel::Critical {
        EscalationPriority::Critical
    } else if level == RiskLevel::High {
        EscalationPriority::High
    } else {
        EscalationPriority::Normal
    }
}

/// Creates escalation requests for accepted triage records, exactly once per
/// record.
pub struct EscalationHandoff {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    bus: EventBus,
}

impl EscalationHandoff {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, bus: EventBus) -> Self {
        Self { storage, bus }
    }

    /// Materialize an accepted triage record into a waiting escalation
    /// request.
    ///
    /// Re-invocation for an already-escalated record returns the existing
    /// request, never a duplicate. Fails with `SessionUnavailable` (and
    /// creates nothing) when the owning session is missing or closed.
    pub async fn create_escalation(
        &self,
        record: &TriageRecord,
        emergency: bool,
    ) -> Result<EscalationRequest, ForYouError> {
        if let Some(existing) = self.storage.escalation_for_triage(&record.id).await? {
            debug!(
                triage_id = %record.id,
                escalation_id = %existing.id,
                "triage record already escalated"
            );
            return Ok(existing);
        }

        if record.status != TriageStatus::Accepted {
            return Err(ForYouError::InvalidTransition {
                entity: "triage record",
                id: record.id.clone(),
                from: record.status.to_string(),
                to: "escalated".to_string(),
            });
        }

        let session = self
            .storage
            .get_session(&record.session_id)
            .await?
            .ok_or_else(|| ForYouError::SessionUnavailable {
                session_id: record.session_id.clone(),
                reason: "session does not exist".to_string(),
            })?;
        if !session.status.is_open() {
            return Err(ForYouError::SessionUnavailable {
                session_id: session.id.clone(),
                reason: format!("session is {}", session.status),
            });
        }

        let priority = map_priority(record.risk_level, emergency);
        let request = EscalationRequest {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            triage_id: record.id.clone(),
            client_id: session.client_id.clone(),
            priority,
            status: EscalationStatus::Waiting,
            volunteer_id: None,
            created_at: now_rfc3339(),
            claimed_at: None,
            completed_at: None,
        };

        // The unique index on triage_id makes this exactly-once even if two
        // callers race past the lookup above.
        let inserted = self.storage.insert_escalation(&request).await?;
        if inserted.id == request.id {
            info!(
                session_id = %session.id,
                escalation_id = %inserted.id,
                priority = %priority,
                "escalation request queued"
            );
            self.bus.publish(TriageEvent::EscalationWaiting {
                session_id: session.id.clone(),
                escalation_id: inserted.id.clone(),
                priority,
            });
        } else {
            debug!(
                triage_id = %record.id,
                escalation_id = %inserted.id,
                "lost creation race, returning existing escalation"
            );
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_mapping_follows_risk() {
        assert_eq!(
            map_priority(RiskLevel::Critical, false),
            EscalationPriority::Critical
        );
        assert_eq!(map_priority(RiskLevel::High, false), EscalationPriority::High);
        assert_eq!(
            map_priority(RiskLevel::Moderate, false),
            EscalationPriority::Normal
        );
        assert_eq!(map_priority(RiskLevel::Low, false), EscalationPriority::Normal);
    }

    #[test]
    fn emergency_flag_overrides_to_critical() {
        assert_eq!(
            map_priority(RiskLevel::Low, true),
            EscalationPriority::Critical
        );
        assert_eq!(
            map_priority(RiskLevel::High, true),
            EscalationPriority::Critical
        );
    }

    use foryou_core::types::SessionStatus;
    use foryou_test_utils::TestHarness;

    async fn seed_accepted_record(
        harness: &TestHarness,
        session_id: &str,
        level: RiskLevel,
    ) -> TriageRecord {
        let record = TriageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            risk_level: level,
            status: TriageStatus::Accepted,
            trigger_message_id: None,
            decline_reason: None,
            anonymized: false,
            created_at: now_rfc3339(),
            decided_at: Some(now_rfc3339()),
        };
        harness.storage.insert_triage(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn creation_is_exactly_once_per_record() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();
        let record = seed_accepted_record(&harness, &session.id, RiskLevel::High).await;

        let handoff = EscalationHandoff::new(harness.storage.clone(), harness.bus.clone());
        let first = handoff.create_escalation(&record, false).await.unwrap();
        let second = handoff.create_escalation(&record, false).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.priority, EscalationPriority::High);
        assert_eq!(harness.queue.list_waiting().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unaccepted_record_cannot_escalate() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();
        let mut record = seed_accepted_record(&harness, &session.id, RiskLevel::High).await;
        record.status = TriageStatus::Offered;
        // Drop the stored escalation state entirely: use a fresh id so the
        // existing-escalation shortcut cannot fire.
        record.id = uuid::Uuid::new_v4().to_string();

        let handoff = EscalationHandoff::new(harness.storage.clone(), harness.bus.clone());
        let err = handoff.create_escalation(&record, false).await.unwrap_err();
        assert!(matches!(err, ForYouError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn closed_session_aborts_with_nothing_created() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();
        let record = seed_accepted_record(&harness, &session.id, RiskLevel::Critical).await;
        harness
            .manager
            .close_session(&session.id, SessionStatus::Completed)
            .await
            .unwrap();

        let handoff = EscalationHandoff::new(harness.storage.clone(), harness.bus.clone());
        let err = handoff.create_escalation(&record, false).await.unwrap_err();
        assert!(matches!(err, ForYouError::SessionUnavailable { .. }));
        assert!(harness.queue.list_waiting().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn emergency_context_queues_at_critical_priority() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();
        let record = seed_accepted_record(&harness, &session.id, RiskLevel::Moderate).await;

        let handoff = EscalationHandoff::new(harness.storage.clone(), harness.bus.clone());
        let escalation = handoff.create_escalation(&record, true).await.unwrap();
        assert_eq!(escalation.priority, EscalationPriority::Critical);
    }
}
