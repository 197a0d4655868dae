// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Risk classifier trait for the external text-analysis boundary.

use async_trait::async_trait;

use crate::error::ForYouError;
use crate::traits::adapter::PluginAdapter;
use crate::types::RawClassification;

/// Adapter over the risk classification collaborator.
///
/// Given a message text, produces a coarse risk tag and a confidence. The
/// reference implementation is a local keyword heuristic; a remote AI model
/// fits behind the same seam. Callers must impose their own timeout and treat
/// non-response as classifier failure; the core recovers from failure by
/// recording a warning, never by crashing the conversation.
#[async_trait]
pub trait RiskClassifier: PluginAdapter {
    /// Classifies a message text into `{tag, confidence}`.
    async fn classify(&self, text: &str) -> Result<RawClassification, ForYouError>;

    /// Whether the text is an explicit ask to be connected to a human
    /// volunteer (e.g. "let me talk to a real person").
    ///
    /// Purely lexical; implementations without a request lexicon return false.
    fn is_handoff_request(&self, text: &str) -> bool {
        let _ = text;
        false
    }
}
