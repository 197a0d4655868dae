// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session message pipeline and the session manager.
//!
//! Each session's `append message -> classify -> aggregate risk -> evaluate
//! triage` sequence runs inside that session's own critical section: the
//! manager hands out one worker per session behind a mutex, so concurrent
//! inbound messages for the same session serialize while different sessions
//! proceed fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use foryou_bus::{EventBus, TriageEvent};
use foryou_core::types::{
    EscalationRequest, Message, MessageRole, Session, SessionStatus, TriageRecord,
    now_rfc3339,
};
use foryou_core::{ForYouError, RiskClassifier, StorageAdapter};

use crate::machine::{TriageDisposition, TriageMachine};
use crate::risk::{RiskAggregator, RiskUpdate};

/// Everything that happened while processing one inbound client message.
#[derive(Debug)]
pub struct MessageOutcome {
    /// The persisted message, with its per-message risk tag when classified.
    pub message: Message,
    /// Risk aggregation result; `None` when the classifier call failed.
    pub risk: Option<RiskUpdate>,
    /// What the triage state machine decided.
    pub disposition: TriageDisposition,
    /// Present when the message was an explicit handoff request: the
    /// accepted record and its escalation.
    pub handoff: Option<(TriageRecord, EscalationRequest)>,
}

/// Runs the per-message pipeline for a single session.
///
/// Held behind a mutex by the [`SessionManager`]; `&mut self` makes the
/// critical section explicit.
pub struct SessionWorker {
    session_id: String,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    classifier: Arc<dyn RiskClassifier>,
    aggregator: RiskAggregator,
    machine: Arc<TriageMachine>,
}

impl SessionWorker {
    fn new(
        session_id: String,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        classifier: Arc<dyn RiskClassifier>,
        machine: Arc<TriageMachine>,
    ) -> Self {
        let aggregator = RiskAggregator::new(storage.clone());
        Self {
            session_id,
            storage,
            classifier,
            aggregator,
            machine,
        }
    }

    /// Process one inbound client message: persist it, classify it, fold the
    /// tag into the session risk, and evaluate the triage transition.
    ///
    /// A classifier failure is recovered locally: the conversation continues
    /// with no risk update and no triage transition, and a failure marker is
    /// recorded on the session.
    pub async fn handle_client_message(
        &mut self,
        text: &str,
    ) -> Result<MessageOutcome, ForYouError> {
        let session = self.require_session().await?;

        let mut message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            role: MessageRole::User,
            content: text.to_string(),
            risk_tag: None,
            metadata: None,
            anonymized: false,
            created_at: now_rfc3339(),
        };
        self.storage.insert_message(&message).await?;
        debug!(session_id = %self.session_id, "persisted client message");

        let risk = match self.classifier.classify(text).await {
            Ok(raw) => {
                let update = self.aggregator.update_session_risk(&session, &raw).await?;
                self.storage.tag_message(&message.id, update.incoming).await?;
                message.risk_tag = Some(update.incoming);
                Some(update)
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "classifier failure, continuing without risk update"
                );
                self.storage
                    .record_classifier_warning(&self.session_id)
                    .await?;
                None
            }
        };

        // Refresh: the aggregator just rewrote the session's risk fields.
        let session = self.require_session().await?;

        let mut handoff = None;
        let disposition = if self.classifier.is_handoff_request(text) {
            // An explicit ask is a client action, honored independently of
            // the classification outcome.
            let (record, escalation) = self
                .machine
                .request_human(&session, Some(&message.id), false)
                .await?;
            handoff = Some((record, escalation));
            TriageDisposition::NoAction
        } else if let Some(update) = &risk {
            self.machine
                .evaluate_message(&session, &message.id, update.level)
                .await?
        } else {
            // Classifier failure: the state machine does not transition.
            TriageDisposition::NoAction
        };

        Ok(MessageOutcome {
            message,
            risk,
            disposition,
            handoff,
        })
    }

    async fn require_session(&self) -> Result<Session, ForYouError> {
        let session = self
            .storage
            .get_session(&self.session_id)
            .await?
            .ok_or_else(|| ForYouError::SessionUnavailable {
                session_id: self.session_id.clone(),
                reason: "session does not exist".to_string(),
            })?;
        if !session.status.is_open() {
            return Err(ForYouError::SessionUnavailable {
                session_id: session.id.clone(),
                reason: format!("session is {}", session.status),
            });
        }
        Ok(session)
    }
}

/// Entry point for the surrounding application: session lifecycle, the
/// per-session message pipeline, and triage decisions.
pub struct SessionManager {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    classifier: Arc<dyn RiskClassifier>,
    machine: Arc<TriageMachine>,
    bus: EventBus,
    workers: Mutex<HashMap<String, Arc<Mutex<SessionWorker>>>>,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        classifier: Arc<dyn RiskClassifier>,
        bus: EventBus,
    ) -> Self {
        let machine = Arc::new(TriageMachine::new(storage.clone(), bus.clone()));
        Self {
            storage,
            classifier,
            machine,
            bus,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// The shared triage state machine.
    pub fn machine(&self) -> Arc<TriageMachine> {
        self.machine.clone()
    }

    /// Resume the client's active session or start a new one.
    pub async fn open_session(&self, client_id: &str) -> Result<Session, ForYouError> {
        let active = self.storage.list_sessions(Some(SessionStatus::Active)).await?;
        if let Some(session) = active.into_iter().find(|s| s.client_id == client_id) {
            debug!(session_id = %session.id, "resuming existing session");
            return Ok(session);
        }

        let now = now_rfc3339();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
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
        };
        self.storage.create_session(&session).await?;
        info!(
            session_id = %session.id,
            client_id = client_id,
            "created new session"
        );
        Ok(session)
    }

    /// Run the per-message pipeline inside the session's critical section.
    pub async fn handle_client_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageOutcome, ForYouError> {
        let worker = self.worker(session_id).await;
        let mut worker = worker.lock().await;
        worker.handle_client_message(text).await
    }

    /// Record an outbound (AI, volunteer, or system) message. Outbound
    /// messages are not classified and never trigger triage.
    pub async fn record_reply(
        &self,
        session_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<Message, ForYouError> {
        if role == MessageRole::User {
            return Err(ForYouError::Internal(
                "client messages go through handle_client_message".to_string(),
            ));
        }
        let session = self.require_session(session_id).await?;
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            role,
            content: text.to_string(),
            risk_tag: None,
            metadata: None,
            anonymized: false,
            created_at: now_rfc3339(),
        };
        self.storage.insert_message(&message).await?;
        Ok(message)
    }

    /// Accept the pending offer, creating the escalation request.
    pub async fn accept_offer(
        &self,
        session_id: &str,
        triage_id: &str,
        emergency: bool,
    ) -> Result<(TriageRecord, EscalationRequest), ForYouError> {
        let worker = self.worker(session_id).await;
        let _guard = worker.lock().await;
        let session = self.require_session(session_id).await?;
        self.machine.accept(&session, triage_id, emergency).await
    }

    /// Decline the pending offer.
    pub async fn decline_offer(
        &self,
        session_id: &str,
        triage_id: &str,
        reason: Option<&str>,
    ) -> Result<TriageRecord, ForYouError> {
        let worker = self.worker(session_id).await;
        let _guard = worker.lock().await;
        let session = self.require_session(session_id).await?;
        self.machine.decline(&session, triage_id, reason).await
    }

    /// Manual "user changed their mind" trigger: honored even while a
    /// decline is standing.
    pub async fn request_human(
        &self,
        session_id: &str,
    ) -> Result<(TriageRecord, EscalationRequest), ForYouError> {
        let worker = self.worker(session_id).await;
        let _guard = worker.lock().await;
        let session = self.require_session(session_id).await?;
        self.machine.request_human(&session, None, false).await
    }

    /// Close a session by explicit action.
    pub async fn close_session(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<Session, ForYouError> {
        let closed = self.storage.close_session(session_id, status).await?;
        self.workers.lock().await.remove(session_id);
        self.bus.publish(TriageEvent::SessionClosed {
            session_id: closed.id.clone(),
            status: closed.status,
        });
        Ok(closed)
    }

    /// The session's triage history in creation order, for "how many times
    /// were you referred" queries.
    pub async fn triage_history(
        &self,
        session_id: &str,
    ) -> Result<Vec<TriageRecord>, ForYouError> {
        self.storage.list_triage(session_id).await
    }

    async fn worker(&self, session_id: &str) -> Arc<Mutex<SessionWorker>> {
        let mut workers = self.workers.lock().await;
        workers
            .entry(session_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SessionWorker::new(
                    session_id.to_string(),
                    self.storage.clone(),
                    self.classifier.clone(),
                    self.machine.clone(),
                )))
            })
            .clone()
    }

    async fn require_session(&self, session_id: &str) -> Result<Session, ForYouError> {
        let session = self
            .storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| ForYouError::SessionUnavailable {
                session_id: session_id.to_string(),
                reason: "session does not exist".to_string(),
            })?;
        if !session.status.is_open() {
            return Err(ForYouError::SessionUnavailable {
                session_id: session.id.clone(),
                reason: format!("session is {}", session.status),
            });
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use foryou_core::types::{EscalationPriority, EscalationStatus, RiskLevel, TriageStatus};
    use foryou_test_utils::TestHarness;
    // Shadow `super::*` so harness-returned dispositions unify with the
    // variants. The one test below that drives a locally-constructed manager
    // qualifies `crate::machine::TriageDisposition` explicitly instead.
    use foryou_test_utils::TriageDisposition;

    #[tokio::test]
    async fn end_to_end_low_moderate_critical_low() {
        let harness = TestHarness::builder()
            .with_tags(&["low", "moderate", "critical", "low"])
            .build()
            .await
            .unwrap();
        let session = harness.open_session("c1").await.unwrap();

        let mut levels = Vec::new();
        for text in ["one", "two", "three", "four"] {
            let outcome = harness.send(&session.id, text).await.unwrap();
            levels.push(outcome.risk.unwrap().level);
        }
        assert_eq!(
            levels,
            [
                RiskLevel::Low,
                RiskLevel::Moderate,
                RiskLevel::Critical,
                RiskLevel::High
            ]
        );

        // Exactly one auto-generated record, pending, carrying the critical
        // severity the session reached.
        let records = harness.storage.list_triage(&session.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TriageStatus::Offered);
        assert_eq!(records[0].risk_level, RiskLevel::Critical);

        // Accepting hands off exactly one critical-priority waiting request.
        let (accepted, escalation) = harness
            .manager
            .accept_offer(&session.id, &records[0].id, false)
            .await
            .unwrap();
        assert_eq!(accepted.status, TriageStatus::Accepted);
        assert_eq!(escalation.priority, EscalationPriority::Critical);
        assert_eq!(escalation.status, EscalationStatus::Waiting);
        assert_eq!(harness.queue.list_waiting().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn classifier_failure_recovers_without_transitions() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.classifier.push_tag("critical", 0.9).await;
        harness.classifier.push_failure("model timed out").await;

        let session = harness.open_session("c1").await.unwrap();
        harness.send(&session.id, "dark thoughts").await.unwrap();

        let outcome = harness.send(&session.id, "hello?").await.unwrap();
        assert!(outcome.risk.is_none());
        assert_eq!(outcome.disposition, TriageDisposition::NoAction);
        assert!(outcome.message.risk_tag.is_none());

        let session = harness.storage.get_session(&session.id).await.unwrap().unwrap();
        // The failure neither de-escalated the session nor dropped the offer.
        assert_eq!(session.current_risk_level, Some(RiskLevel::Critical));
        assert_eq!(session.classifier_warnings, 1);
        assert!(
            harness
                .storage
                .pending_triage(&session.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unknown_tag_defaults_to_low_with_warning() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.classifier.push_tag("catastrophic", 0.4).await;

        let session = harness.open_session("c1").await.unwrap();
        let outcome = harness.send(&session.id, "hi").await.unwrap();

        let update = outcome.risk.unwrap();
        assert!(update.warned);
        assert_eq!(update.level, RiskLevel::Low);
        assert_eq!(outcome.message.risk_tag, Some(RiskLevel::Low));

        let session = harness.storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.classifier_warnings, 1);
        assert_eq!(session.current_risk_level, Some(RiskLevel::Low));
    }

    #[tokio::test]
    async fn handoff_request_is_accepted_in_one_step() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();

        let outcome = harness
            .send(&session.id, "can I please talk to a volunteer")
            .await
            .unwrap();

        let (record, escalation) = outcome.handoff.expect("handoff expected");
        assert_eq!(record.status, TriageStatus::Accepted);
        assert_eq!(record.trigger_message_id.as_deref(), Some(outcome.message.id.as_str()));
        assert_eq!(escalation.status, EscalationStatus::Waiting);
        assert_eq!(escalation.priority, EscalationPriority::Normal);
    }

    #[tokio::test]
    async fn initial_risk_level_is_first_observed() {
        let harness = TestHarness::builder()
            .with_tags(&["moderate", "critical"])
            .build()
            .await
            .unwrap();
        let session = harness.open_session("c1").await.unwrap();
        harness.send(&session.id, "one").await.unwrap();
        harness.send(&session.id, "two").await.unwrap();

        let session = harness.storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.initial_risk_level, Some(RiskLevel::Moderate));
        assert_eq!(session.current_risk_level, Some(RiskLevel::Critical));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_messages_for_one_session_serialize() {
        let harness = Arc::new(TestHarness::builder().build().await.unwrap());
        let session = harness.open_session("c1").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let harness = harness.clone();
            let session_id = session.id.clone();
            handles.push(tokio::spawn(async move {
                harness.send(&session_id, &format!("message {i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let session = harness.storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.message_count, 8);
        let messages = harness.storage.get_messages(&session.id, None).await.unwrap();
        assert_eq!(messages.len(), 8);
    }

    #[tokio::test]
    async fn replies_are_recorded_without_classification() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();

        let reply = harness
            .manager
            .record_reply(&session.id, MessageRole::Ai, "I hear you.")
            .await
            .unwrap();
        assert_eq!(reply.role, MessageRole::Ai);
        assert!(reply.risk_tag.is_none());

        let err = harness
            .manager
            .record_reply(&session.id, MessageRole::User, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ForYouError::Internal(_)));

        let session = harness.storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.current_risk_level, None);
        assert_eq!(session.message_count, 1);
    }

    #[tokio::test]
    async fn closed_sessions_reject_messages() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("c1").await.unwrap();
        harness
            .manager
            .close_session(&session.id, SessionStatus::Completed)
            .await
            .unwrap();

        let err = harness.send(&session.id, "anyone there?").await.unwrap_err();
        assert!(matches!(err, ForYouError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn open_session_resumes_the_active_one() {
        let harness = TestHarness::builder().build().await.unwrap();
        let first = harness.open_session("c1").await.unwrap();
        let resumed = harness.open_session("c1").await.unwrap();
        assert_eq!(first.id, resumed.id);

        harness
            .manager
            .close_session(&first.id, SessionStatus::Completed)
            .await
            .unwrap();
        let fresh = harness.open_session("c1").await.unwrap();
        assert_ne!(fresh.id, first.id);
    }

    #[tokio::test]
    async fn keyword_classifier_drives_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let storage_config = foryou_config::model::StorageConfig {
            database_path: dir.path().join("kw.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = foryou_storage::SqliteStorage::new(storage_config);
        storage.initialize().await.unwrap();
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
        let bus = EventBus::new(16);
        let classifier = Arc::new(foryou_classifier::KeywordClassifier::new().unwrap());
        let manager = SessionManager::new(storage.clone(), classifier, bus);

        let session = manager.open_session("c1").await.unwrap();

        let calm = manager
            .handle_client_message(&session.id, "had an ok day at work")
            .await
            .unwrap();
        assert_eq!(calm.risk.as_ref().unwrap().level, RiskLevel::Low);
        assert_eq!(calm.disposition, crate::machine::TriageDisposition::NoAction);

        let dark = manager
            .handle_client_message(&session.id, "I want to die")
            .await
            .unwrap();
        assert_eq!(dark.risk.as_ref().unwrap().level, RiskLevel::Critical);
        assert!(matches!(
            dark.disposition,
            crate::machine::TriageDisposition::Offered(_)
        ));

        // The explicit ask accepts the pending offer at the severity the
        // session reached.
        let ask = manager
            .handle_client_message(&session.id, "yes, please connect me with a volunteer")
            .await
            .unwrap();
        let (record, escalation) = ask.handoff.expect("handoff expected");
        assert_eq!(record.status, TriageStatus::Accepted);
        assert_eq!(escalation.priority, EscalationPriority::Critical);
    }

    #[tokio::test]
    async fn triage_history_counts_referral_episodes() {
        let harness = TestHarness::builder()
            .with_tags(&["moderate", "high"])
            .build()
            .await
            .unwrap();
        let session = harness.open_session("c1").await.unwrap();

        let first = harness.send(&session.id, "one").await.unwrap();
        let record = match first.disposition {
            TriageDisposition::Offered(record) => record,
            other => panic!("expected Offered, got {other:?}"),
        };
        harness
            .manager
            .decline_offer(&session.id, &record.id, None)
            .await
            .unwrap();
        harness.send(&session.id, "two").await.unwrap();

        let history = harness.manager.triage_history(&session.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, TriageStatus::Declined);
        assert_eq!(history[1].status, TriageStatus::Offered);
    }
}
