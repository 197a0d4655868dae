// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock risk classifier for deterministic testing.
//!
//! Scripted outcomes are popped from a FIFO queue; when the queue is empty a
//! default low-risk classification is returned. Failures can be enqueued to
//! exercise the classifier-failure recovery path.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use foryou_core::traits::{PluginAdapter, RiskClassifier};
use foryou_core::types::{AdapterType, HealthStatus, RawClassification};
use foryou_core::ForYouError;

enum ScriptedOutcome {
    Tag(String, f64),
    Failure(String),
}

/// A mock classifier that returns pre-scripted tags or failures.
pub struct MockClassifier {
    outcomes: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    handoff_markers: Vec<String>,
}

impl MockClassifier {
    /// Create a mock classifier with an empty script queue.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            handoff_markers: vec!["volunteer".to_string(), "real person".to_string()],
        }
    }

    /// Create a mock pre-loaded with the given tags (default confidence).
    pub fn with_tags(tags: &[&str]) -> Self {
        let mut queue = VecDeque::new();
        for tag in tags {
            queue.push_back(ScriptedOutcome::Tag(tag.to_string(), 0.9));
        }
        Self {
            outcomes: Arc::new(Mutex::new(queue)),
            handoff_markers: vec!["volunteer".to_string(), "real person".to_string()],
        }
    }

    /// Enqueue a tag with a confidence.
    pub async fn push_tag(&self, tag: &str, confidence: f64) {
        self.outcomes
            .lock()
            .await
            .push_back(ScriptedOutcome::Tag(tag.to_string(), confidence));
    }

    /// Enqueue a classifier failure.
    pub async fn push_failure(&self, message: &str) {
        self.outcomes
            .lock()
            .await
            .push_back(ScriptedOutcome::Failure(message.to_string()));
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockClassifier {
    fn name(&self) -> &str {
        "mock-classifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Classifier
    }

    async fn health_check(&self) -> Result<HealthStatus, ForYouError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ForYouError> {
        Ok(())
    }
}

#[async_trait]
impl RiskClassifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<RawClassification, ForYouError> {
        match self.outcomes.lock().await.pop_front() {
            Some(ScriptedOutcome::Tag(tag, confidence)) => {
                Ok(RawClassification { tag, confidence })
            }
            Some(ScriptedOutcome::Failure(message)) => Err(ForYouError::Classifier {
                message,
                source: None,
            }),
            None => Ok(RawClassification {
                tag: "low".to_string(),
                confidence: 0.7,
            }),
        }
    }

    fn is_handoff_request(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.handoff_markers.iter().any(|m| text.contains(m))
    }
}
