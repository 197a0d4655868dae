// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use foryou_config::model::StorageConfig;
use foryou_core::types::{
    AdapterType, EscalationRequest, HealthStatus, Message, RiskLevel, Session,
    SessionStatus, TriageRecord, TriageStatus,
};
use foryou_core::{ForYouError, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, ForYouError> {
        self.db.get().ok_or_else(|| ForYouError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ForYouError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ForYouError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ForYouError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ForYouError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ForYouError> {
        self.db()?.close().await
    }

    // --- Session operations ---

    async fn create_session(&self, session: &Session) -> Result<(), ForYouError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, ForYouError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, ForYouError> {
        queries::sessions::list_sessions(self.db()?, status).await
    }

    async fn update_session_risk(
        &self,
        id: &str,
        initial: Option<RiskLevel>,
        current: RiskLevel,
    ) -> Result<(), ForYouError> {
        queries::sessions::update_session_risk(self.db()?, id, initial, current).await
    }

    async fn record_classifier_warning(&self, id: &str) -> Result<(), ForYouError> {
        queries::sessions::record_classifier_warning(self.db()?, id).await
    }

    async fn close_session(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> Result<Session, ForYouError> {
        queries::sessions::close_session(self.db()?, id, status).await
    }

    async fn transfer_session(&self, id: &str, volunteer_id: &str) -> Result<(), ForYouError> {
        queries::sessions::transfer_session(self.db()?, id, volunteer_id).await
    }

    async fn list_idle_sessions(&self, cutoff: &str) -> Result<Vec<Session>, ForYouError> {
        queries::sessions::list_idle_sessions(self.db()?, cutoff).await
    }

    async fn anonymize_session(&self, id: &str) -> Result<(), ForYouError> {
        queries::sessions::anonymize_session(self.db()?, id).await
    }

    // --- Message operations ---

    async fn insert_message(&self, message: &Message) -> Result<(), ForYouError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn tag_message(&self, id: &str, tag: RiskLevel) -> Result<(), ForYouError> {
        queries::messages::tag_message(self.db()?, id, tag).await
    }

    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ForYouError> {
        queries::messages::get_messages(self.db()?, session_id, limit).await
    }

    // --- Triage record operations ---

    async fn insert_triage(&self, record: &TriageRecord) -> Result<(), ForYouError> {
        queries::triage::insert_triage(self.db()?, record).await
    }

    async fn get_triage(&self, id: &str) -> Result<Option<TriageRecord>, ForYouError> {
        queries::triage::get_triage(self.db()?, id).await
    }

    async fn pending_triage(
        &self,
        session_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError> {
        queries::triage::pending_triage(self.db()?, session_id).await
    }

    async fn latest_triage(
        &self,
        session_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError> {
        queries::triage::latest_triage(self.db()?, session_id).await
    }

    async fn list_triage(&self, session_id: &str) -> Result<Vec<TriageRecord>, ForYouError> {
        queries::triage::list_triage(self.db()?, session_id).await
    }

    async fn escalate_pending_triage(
        &self,
        id: &str,
        level: RiskLevel,
    ) -> Result<Option<TriageRecord>, ForYouError> {
        queries::triage::escalate_pending_triage(self.db()?, id, level).await
    }

    async fn triage_for_trigger(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<Option<TriageRecord>, ForYouError> {
        queries::triage::triage_for_trigger(self.db()?, session_id, message_id).await
    }

    async fn resolve_triage(
        &self,
        id: &str,
        status: TriageStatus,
        reason: Option<&str>,
    ) -> Result<TriageRecord, ForYouError> {
        queries::triage::resolve_triage(self.db()?, id, status, reason).await
    }

    // --- Escalation queue operations ---

    async fn insert_escalation(
        &self,
        request: &EscalationRequest,
    ) -> Result<EscalationRequest, ForYouError> {
        queries::escalations::insert_escalation(self.db()?, request).await
    }

    async fn get_escalation(
        &self,
        id: &str,
    ) -> Result<Option<EscalationRequest>, ForYouError> {
        queries::escalations::get_escalation(self.db()?, id).await
    }

    async fn escalation_for_triage(
        &self,
        triage_id: &str,
    ) -> Result<Option<EscalationRequest>, ForYouError> {
        queries::escalations::escalation_for_triage(self.db()?, triage_id).await
    }

    async fn list_waiting_escalations(&self) -> Result<Vec<EscalationRequest>, ForYouError> {
        queries::escalations::list_waiting_escalations(self.db()?).await
    }

    async fn claim_escalation(
        &self,
        id: &str,
        volunteer_id: &str,
    ) -> Result<EscalationRequest, ForYouError> {
        queries::escalations::claim_escalation(self.db()?, id, volunteer_id).await
    }

    async fn release_escalation(&self, id: &str) -> Result<EscalationRequest, ForYouError> {
        queries::escalations::release_escalation(self.db()?, id).await
    }

    async fn complete_escalation(&self, id: &str) -> Result<EscalationRequest, ForYouError> {
        queries::escalations::complete_escalation(self.db()?, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_message, make_session};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
    }

    #[tokio::test]
    async fn full_session_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let session = make_session("sess-adapter-1", "client-1");
        storage.create_session(&session).await.unwrap();

        let retrieved = storage.get_session("sess-adapter-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "sess-adapter-1");
        assert_eq!(retrieved.status, SessionStatus::Active);

        storage
            .insert_message(&make_message("m1", "sess-adapter-1", "hello"))
            .await
            .unwrap();
        let messages = storage.get_messages("sess-adapter-1", None).await.unwrap();
        assert_eq!(messages.len(), 1);

        storage
            .update_session_risk("sess-adapter-1", Some(RiskLevel::Low), RiskLevel::Low)
            .await
            .unwrap();
        let updated = storage.get_session("sess-adapter-1").await.unwrap().unwrap();
        assert_eq!(updated.current_risk_level, Some(RiskLevel::Low));
        assert_eq!(updated.message_count, 1);

        let closed = storage
            .close_session("sess-adapter-1", SessionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Completed);

        storage.shutdown().await.unwrap();
    }
}
