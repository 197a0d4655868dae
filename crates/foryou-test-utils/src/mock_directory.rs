// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock volunteer directory with an explicit eligible set.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use foryou_core::ForYouError;
use foryou_core::traits::VolunteerDirectory;

/// A mock directory where eligibility is an explicit allow-set.
pub struct MockDirectory {
    eligible: Arc<Mutex<HashSet<String>>>,
}

impl MockDirectory {
    /// Create a directory where nobody is eligible yet.
    pub fn new() -> Self {
        Self {
            eligible: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create a directory with the given volunteers already eligible.
    pub fn allowing(volunteer_ids: &[&str]) -> Self {
        let set = volunteer_ids.iter().map(|v| v.to_string()).collect();
        Self {
            eligible: Arc::new(Mutex::new(set)),
        }
    }

    /// Mark a volunteer eligible.
    pub async fn allow(&self, volunteer_id: &str) {
        self.eligible.lock().await.insert(volunteer_id.to_string());
    }

    /// Revoke a volunteer's eligibility.
    pub async fn revoke(&self, volunteer_id: &str) {
        self.eligible.lock().await.remove(volunteer_id);
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolunteerDirectory for MockDirectory {
    async fn is_eligible(&self, volunteer_id: &str) -> Result<bool, ForYouError> {
        Ok(self.eligible.lock().await.contains(volunteer_id))
    }
}
