// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Risk aggregation: folding per-message risk tags into a session-level
//! running risk.
//!
//! Escalation is always immediate. De-escalation out of `critical` is clamped
//! to one severity step per message, so an acute risk signal is never
//! forgotten because of a single calmer message.

use std::sync::Arc;

use tracing::{debug, warn};

use foryou_core::types::{RawClassification, RiskLevel, Session};
use foryou_core::{ForYouError, StorageAdapter};

/// Result of applying one classified message to a session's risk state.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskUpdate {
    /// Session level before this message.
    pub previous: Option<RiskLevel>,
    /// Per-message tag as parsed from the classifier.
    pub incoming: RiskLevel,
    /// Session level after this message.
    pub level: RiskLevel,
    /// Whether the anti-whiplash clamp overrode the incoming tag.
    pub clamped: bool,
    /// Whether the classifier tag was unrecognized and defaulted to low.
    pub warned: bool,
}

/// Parse a classifier tag leniently.
///
/// An unrecognized tag is treated as `low` with a warning flag; it never
/// crashes the conversation.
pub fn parse_tag(tag: &str) -> (RiskLevel, bool) {
    match tag.trim().to_lowercase().parse::<RiskLevel>() {
        Ok(level) => (level, false),
        Err(_) => (RiskLevel::Low, true),
    }
}

/// Fold an incoming per-message tag into the current session level.
///
/// Returns the new level and whether the clamp fired. Rules:
/// - no current level: adopt the incoming tag;
/// - more severe incoming: adopt immediately;
/// - less severe incoming while `critical`: floor at `high`;
/// - less severe incoming below `critical`: adopt as-is.
pub fn fold_risk(current: Option<RiskLevel>, incoming: RiskLevel) -> (RiskLevel, bool) {
    match current {
        None => (incoming, false),
        Some(current) if incoming >= current => (incoming, false),
        Some(RiskLevel::Critical) => {
            let floor = RiskLevel::Critical.step_down();
            if incoming < floor {
                (floor, true)
            } else {
                (incoming, false)
            }
        }
        Some(_) => (incoming, false),
    }
}

/// Maintains a session's running risk level from a stream of per-message
/// classifier outputs, persisting the result on the session.
pub struct RiskAggregator {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl RiskAggregator {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Apply one classifier output to the session and persist the updated
    /// risk fields. The initial level is set on the first call only.
    pub async fn update_session_risk(
        &self,
        session: &Session,
        raw: &RawClassification,
    ) -> Result<RiskUpdate, ForYouError> {
        let (incoming, warned) = parse_tag(&raw.tag);
        if warned {
            warn!(
                session_id = %session.id,
                tag = %raw.tag,
                "unrecognized risk tag, treating as low"
            );
            self.storage.record_classifier_warning(&session.id).await?;
        }

        let (level, clamped) = fold_risk(session.current_risk_level, incoming);
        if clamped {
            debug!(
                session_id = %session.id,
                incoming = %incoming,
                level = %level,
                "de-escalation clamped below critical"
            );
        }

        self.storage
            .update_session_risk(&session.id, Some(level), level)
            .await?;

        Ok(RiskUpdate {
            previous: session.current_risk_level,
            incoming,
            level,
            clamped,
            warned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LEVELS: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    #[test]
    fn first_tag_is_adopted_directly() {
        for level in LEVELS {
            assert_eq!(fold_risk(None, level), (level, false));
        }
    }

    #[test]
    fn escalation_is_always_immediate() {
        assert_eq!(
            fold_risk(Some(RiskLevel::Low), RiskLevel::Critical),
            (RiskLevel::Critical, false)
        );
        assert_eq!(
            fold_risk(Some(RiskLevel::Moderate), RiskLevel::High),
            (RiskLevel::High, false)
        );
    }

    #[test]
    fn critical_deescalates_one_step_at_most() {
        // A single message can never pull the session directly from critical
        // to low or moderate; it must pass through high first.
        assert_eq!(
            fold_risk(Some(RiskLevel::Critical), RiskLevel::Low),
            (RiskLevel::High, true)
        );
        assert_eq!(
            fold_risk(Some(RiskLevel::Critical), RiskLevel::Moderate),
            (RiskLevel::High, true)
        );
        assert_eq!(
            fold_risk(Some(RiskLevel::Critical), RiskLevel::High),
            (RiskLevel::High, false)
        );
    }

    #[test]
    fn below_critical_deescalation_is_unclamped() {
        assert_eq!(
            fold_risk(Some(RiskLevel::High), RiskLevel::Low),
            (RiskLevel::Low, false)
        );
        assert_eq!(
            fold_risk(Some(RiskLevel::Moderate), RiskLevel::Low),
            (RiskLevel::Low, false)
        );
    }

    #[test]
    fn unknown_tags_default_to_low_with_warning() {
        assert_eq!(parse_tag("catastrophic"), (RiskLevel::Low, true));
        assert_eq!(parse_tag(""), (RiskLevel::Low, true));
        assert_eq!(parse_tag("HIGH"), (RiskLevel::High, false));
        assert_eq!(parse_tag("  moderate  "), (RiskLevel::Moderate, false));
    }

    #[test]
    fn whiplash_sequence_settles_at_high() {
        let mut current = None;
        let mut observed = Vec::new();
        for tag in [
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::Critical,
            RiskLevel::Low,
        ] {
            let (next, _) = fold_risk(current, tag);
            observed.push(next);
            current = Some(next);
        }
        assert_eq!(
            observed,
            [
                RiskLevel::Low,
                RiskLevel::Moderate,
                RiskLevel::Critical,
                RiskLevel::High
            ]
        );
    }

    fn arb_level() -> impl Strategy<Value = RiskLevel> {
        prop::sample::select(&LEVELS[..])
    }

    proptest! {
        #[test]
        fn folded_level_never_drops_below_incoming(
            current in prop::option::of(arb_level()),
            incoming in arb_level(),
        ) {
            let (level, _) = fold_risk(current, incoming);
            prop_assert!(level >= incoming);
        }

        #[test]
        fn leaving_critical_floors_at_high(incoming in arb_level()) {
            let (level, _) = fold_risk(Some(RiskLevel::Critical), incoming);
            prop_assert!(level >= RiskLevel::High);
        }

        #[test]
        fn escalating_tags_are_adopted_verbatim(
            current in arb_level(),
            incoming in arb_level(),
        ) {
            prop_assume!(incoming >= current);
            let (level, clamped) = fold_risk(Some(current), incoming);
            prop_assert_eq!(level, incoming);
            prop_assert!(!clamped);
        }

        #[test]
        fn processing_critical_always_yields_critical(
            current in prop::option::of(arb_level()),
        ) {
            let (level, _) = fold_risk(current, RiskLevel::Critical);
            prop_assert_eq!(level, RiskLevel::Critical);
        }
    }
}
