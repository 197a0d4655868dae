// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete triage stack with mock adapters and
//! a temp SQLite database: storage, event bus, session manager, volunteer
//! queue, and idle sweeper. Tests drive the same operation surface the
//! surrounding application would.

use std::sync::Arc;

use tokio::sync::broadcast;

use foryou_bus::{EventBus, TriageEvent};
use foryou_config::model::{ForYouConfig, SessionConfig, StorageConfig};
use foryou_core::types::Session;
use foryou_core::{ForYouError, StorageAdapter};
use foryou_storage::SqliteStorage;
use foryou_triage::session::MessageOutcome;
use foryou_triage::{IdleSweeper, SessionManager, VolunteerQueue};

use crate::mock_classifier::MockClassifier;
use crate::mock_directory::MockDirectory;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    tags: Vec<String>,
    eligible: Vec<String>,
    idle_timeout_secs: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tags: Vec::new(),
            eligible: vec!["vol-1".to_string()],
            idle_timeout_secs: 1800,
        }
    }

    /// Script the mock classifier's tag sequence.
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Set the eligible volunteers (default: just `vol-1`).
    pub fn with_eligible(mut self, volunteer_ids: &[&str]) -> Self {
        self.eligible = volunteer_ids.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Override the idle timeout used by the sweeper.
    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ForYouError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| ForYouError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let config = ForYouConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            session: SessionConfig {
                idle_timeout_secs: self.idle_timeout_secs,
                sweep_interval_secs: 1,
            },
            ..ForYouConfig::default()
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

        let bus = EventBus::new(config.bus.capacity);

        let classifier = Arc::new(if self.tags.is_empty() {
            MockClassifier::new()
        } else {
            let tags: Vec<&str> = self.tags.iter().map(|t| t.as_str()).collect();
            MockClassifier::with_tags(&tags)
        });

        let eligible: Vec<&str> = self.eligible.iter().map(|v| v.as_str()).collect();
        let directory = Arc::new(MockDirectory::allowing(&eligible));

        let manager = SessionManager::new(storage.clone(), classifier.clone(), bus.clone());
        let queue = VolunteerQueue::new(storage.clone(), directory.clone(), bus.clone());
        let sweeper = IdleSweeper::new(storage.clone(), bus.clone(), &config.session);

        Ok(TestHarness {
            storage,
            classifier,
            directory,
            bus,
            manager,
            queue,
            sweeper,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    /// The scripted mock classifier.
    pub classifier: Arc<MockClassifier>,
    /// The mock volunteer directory.
    pub directory: Arc<MockDirectory>,
    /// The event bus shared by all subsystems.
    pub bus: EventBus,
    /// The session manager under test.
    pub manager: SessionManager,
    /// The volunteer queue under test.
    pub queue: VolunteerQueue,
    /// The idle sweeper under test.
    pub sweeper: IdleSweeper,
    /// The configuration the stack was assembled from.
    pub config: ForYouConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Open a session for a test client.
    pub async fn open_session(&self, client_id: &str) -> Result<Session, ForYouError> {
        self.manager.open_session(client_id).await
    }

    /// Drive one client message through the full pipeline.
    pub async fn send(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageOutcome, ForYouError> {
        self.manager.handle_client_message(session_id, text).await
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.bus.subscribe()
    }
}
