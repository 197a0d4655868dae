// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inactivity sweeper: closes sessions idle beyond a configurable timeout.
//!
//! The sweeper plays the external-collaborator role from the concurrency
//! model: it invokes ordinary state transitions on a schedule and never
//! touches triage records retroactively. Existing records of a swept session
//! remain as they were.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use foryou_bus::{EventBus, TriageEvent};
use foryou_config::model::SessionConfig;
use foryou_core::types::SessionStatus;
use foryou_core::{ForYouError, StorageAdapter};

/// Periodically closes sessions whose last activity is older than the idle
/// timeout, marking them abandoned.
pub struct IdleSweeper {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    bus: EventBus,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl IdleSweeper {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        bus: EventBus,
        config: &SessionConfig,
    ) -> Self {
        Self {
            storage,
            bus,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Run one sweep pass. Returns the number of sessions closed.
    ///
    /// A session that was closed or revived between listing and closing is
    /// skipped, not an error.
    pub async fn run_once(&self) -> Result<usize, ForYouError> {
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::from_std(self.idle_timeout).unwrap_or_default())
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let idle = self.storage.list_idle_sessions(&cutoff).await?;
        if idle.is_empty() {
            debug!("sweep pass: no idle sessions");
            return Ok(0);
        }

        let mut closed = 0;
        for session in idle {
            match self
                .storage
                .close_session(&session.id, SessionStatus::Abandoned)
                .await
            {
                Ok(session) => {
                    info!(
                        session_id = %session.id,
                        last_activity_at = %session.last_activity_at,
                        "idle session closed as abandoned"
                    );
                    self.bus.publish(TriageEvent::SessionClosed {
                        session_id: session.id.clone(),
                        status: session.status,
                    });
                    closed += 1;
                }
                Err(ForYouError::AlreadyResolved { .. })
                | Err(ForYouError::SessionUnavailable { .. }) => {
                    debug!(session_id = %session.id, "session changed under the sweeper, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(closed)
    }

    /// Run sweep passes on the configured interval until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            idle_timeout_secs = self.idle_timeout.as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "idle sweeper running"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("idle sweeper stopped");
                    break;
                }
                _ = tokio::time::sleep(self.sweep_interval) => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "sweep pass failed");
                    }
                }
            }
        }
    }
}
