// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volunteer directory trait for claim-time eligibility checks.

use async_trait::async_trait;

use crate::error::ForYouError;

/// Narrow seam over the volunteer management collaborator.
///
/// The queue consults this before attempting an atomic claim. Availability
/// windows, concurrent-chat capacity, and approval state all live behind this
/// single predicate in the external system.
#[async_trait]
pub trait VolunteerDirectory: Send + Sync + 'static {
    /// Whether the volunteer may claim a waiting escalation request right now.
    async fn is_eligible(&self, volunteer_id: &str) -> Result<bool, ForYouError>;
}
