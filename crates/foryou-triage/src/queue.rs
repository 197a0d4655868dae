// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The volunteer queue: the ordered pool of waiting escalation requests and
//! the exclusive-claim operation that binds one volunteer to one request.

use std::sync::Arc;

use tracing::{info, warn};

use foryou_bus::{EventBus, TriageEvent};
use foryou_core::types::{
    EscalationRequest, Message, MessageRole, TriageStatus, now_rfc3339,
};
use foryou_core::{ForYouError, StorageAdapter, VolunteerDirectory};

/// System message appended to a session when a volunteer takes over.
const TRANSFER_NOTICE: &str =
    "Your conversation has been transferred to a volunteer.";

/// Mediates volunteer access to the pool of waiting escalation requests.
pub struct VolunteerQueue {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    directory: Arc<dyn VolunteerDirectory>,
    bus: EventBus,
}

impl VolunteerQueue {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        directory: Arc<dyn VolunteerDirectory>,
        bus: EventBus,
    ) -> Self {
        Self {
            storage,
            directory,
            bus,
        }
    }

    /// Snapshot of the waiting pool in service order: critical > high >
    /// normal, strict FIFO within a tier. Does not mutate state.
    pub async fn list_waiting(&self) -> Result<Vec<EscalationRequest>, ForYouError> {
        self.storage.list_waiting_escalations().await
    }

    /// Exclusively claim a waiting request for a volunteer.
    ///
    /// The eligibility gate runs first; an ineligible volunteer is rejected
    /// without touching the queue row. The claim itself is an atomic
    /// conditional update: of any number of concurrent claimers exactly one
    /// succeeds, the rest receive `ClaimConflict`. On success the owning
    /// session is transferred to the volunteer and a system message is
    /// appended to the conversation.
    pub async fn claim(
        &self,
        escalation_id: &str,
        volunteer_id: &str,
    ) -> Result<EscalationRequest, ForYouError> {
        if !self.directory.is_eligible(volunteer_id).await? {
            return Err(ForYouError::IneligibleVolunteer {
                volunteer_id: volunteer_id.to_string(),
            });
        }

        let claimed = self
            .storage
            .claim_escalation(escalation_id, volunteer_id)
            .await?;

        self.storage
            .transfer_session(&claimed.session_id, volunteer_id)
            .await?;
        let notice = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: claimed.session_id.clone(),
            role: MessageRole::System,
            content: TRANSFER_NOTICE.to_string(),
            risk_tag: None,
            metadata: None,
            anonymized: false,
            created_at: now_rfc3339(),
        };
        self.storage.insert_message(&notice).await?;

        info!(
            escalation_id = %claimed.id,
            session_id = %claimed.session_id,
            volunteer_id = volunteer_id,
            "escalation claimed"
        );
        self.bus.publish(TriageEvent::EscalationClaimed {
            session_id: claimed.session_id.clone(),
            escalation_id: claimed.id.clone(),
            volunteer_id: volunteer_id.to_string(),
        });
        Ok(claimed)
    }

    /// Return an active request to the waiting pool after its volunteer
    /// disconnected. The request keeps its original creation time, so it
    /// resumes its FIFO position within its priority tier.
    pub async fn release_on_disconnect(
        &self,
        escalation_id: &str,
    ) -> Result<EscalationRequest, ForYouError> {
        let released = self.storage.release_escalation(escalation_id).await?;
        warn!(
            escalation_id = %released.id,
            session_id = %released.session_id,
            "escalation released back to the waiting pool"
        );
        self.bus.publish(TriageEvent::EscalationReleased {
            session_id: released.session_id.clone(),
            escalation_id: released.id.clone(),
        });
        Ok(released)
    }

    /// Mark an active request completed when the 1:1 interaction ends, and
    /// close out the originating triage episode.
    pub async fn complete(
        &self,
        escalation_id: &str,
    ) -> Result<EscalationRequest, ForYouError> {
        let completed = self.storage.complete_escalation(escalation_id).await?;
        self.storage
            .resolve_triage(&completed.triage_id, TriageStatus::Completed, None)
            .await?;
        info!(
            escalation_id = %completed.id,
            session_id = %completed.session_id,
            "escalation completed"
        );
        Ok(completed)
    }
}
