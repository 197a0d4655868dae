// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for the ForYou triage core.
//!
//! The core emits state-change events that an external UI/notification
//! system subscribes to; the core does not render or push anything itself.
//! Publishing is fire-and-forget: with no subscribers the event is dropped
//! and logged at debug level, and a slow subscriber that falls behind the
//! channel capacity observes a lag error rather than blocking publishers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use foryou_core::types::{EscalationPriority, RiskLevel, SessionStatus};

/// A state-change event emitted by the triage core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriageEvent {
    /// A triage record was created and awaits the client's decision.
    TriageOffered {
        session_id: String,
        triage_id: String,
        risk_level: RiskLevel,
    },
    /// The client agreed to be forwarded to a volunteer.
    TriageAccepted {
        session_id: String,
        triage_id: String,
    },
    /// The client refused the offer.
    TriageDeclined {
        session_id: String,
        triage_id: String,
        reason: Option<String>,
    },
    /// An escalation request entered the volunteer queue.
    EscalationWaiting {
        session_id: String,
        escalation_id: String,
        priority: EscalationPriority,
    },
    /// A volunteer claimed a waiting escalation request.
    EscalationClaimed {
        session_id: String,
        escalation_id: String,
        volunteer_id: String,
    },
    /// An active escalation request was returned to the waiting pool.
    EscalationReleased {
        session_id: String,
        escalation_id: String,
    },
    /// A session reached a terminal status.
    SessionClosed {
        session_id: String,
        status: SessionStatus,
    },
}

/// Broadcast bus carrying [`TriageEvent`]s to any number of subscribers.
///
/// Cloning the bus is cheap; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TriageEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.tx.subscribe()
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event to all subscribers.
    ///
    /// Never blocks and never fails the publishing operation: an event with
    /// no subscribers is dropped.
    pub fn publish(&self, event: TriageEvent) {
        match self.tx.send(event) {
            Ok(subscribers) => {
                debug!(subscribers, "event published");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "event dropped: no subscribers");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
