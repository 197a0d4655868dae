// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default keyword-heuristic risk classifier.
//!
//! Scores a message against weighted risk-signal categories, amplifies by
//! contextual urgency modifiers, credits protective factors, then maps the
//! clamped score onto the four-tag contract. Entirely local and synchronous
//! under the hood; packaged behind [`RiskClassifier`] so a remote AI model
//! can replace it without touching the core.

mod lexicon;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use foryou_core::error::ForYouError;
use foryou_core::traits::{PluginAdapter, RiskClassifier};
use foryou_core::types::{AdapterType, HealthStatus, RawClassification, RiskLevel};

use crate::lexicon::{
    CONTEXT_MODIFIERS, HANDOFF_PATTERNS, PROTECTIVE_CREDIT, PROTECTIVE_PATTERNS,
    RISK_CATEGORIES,
};

/// Result of scoring one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub level: RiskLevel,
    /// Raw score in [0, 1] after modifiers and protective credits.
    pub score: f64,
    pub confidence: f64,
    /// Names of the risk categories that matched.
    pub matched_categories: Vec<&'static str>,
}

impl Assessment {
    fn low_default() -> Self {
        Self {
            level: RiskLevel::Low,
            score: 0.0,
            confidence: 0.5,
            matched_categories: Vec::new(),
        }
    }
}

struct CompiledCategory {
    name: &'static str,
    weight: f64,
    patterns: Vec<Regex>,
}

struct CompiledModifier {
    name: &'static str,
    multiplier: f64,
    patterns: Vec<Regex>,
}

/// Keyword/regex risk classifier with weighted categories.
pub struct KeywordClassifier {
    categories: Vec<CompiledCategory>,
    modifiers: Vec<CompiledModifier>,
    protective: Vec<Regex>,
    handoff: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>, ForYouError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ForYouError::Classifier {
                message: format!("invalid lexicon pattern `{p}`"),
                source: Some(Box::new(e)),
            })
        })
        .collect()
}

impl KeywordClassifier {
    /// Compiles the lexicon into a ready classifier.
    pub fn new() -> Result<Self, ForYouError> {
        let categories = RISK_CATEGORIES
            .iter()
            .map(|c| {
                Ok(CompiledCategory {
                    name: c.name,
                    weight: c.weight,
                    patterns: compile(c.patterns)?,
                })
            })
            .collect::<Result<Vec<_>, ForYouError>>()?;
        let modifiers = CONTEXT_MODIFIERS
            .iter()
            .map(|m| {
                Ok(CompiledModifier {
                    name: m.name,
                    multiplier: m.multiplier,
                    patterns: compile(m.patterns)?,
                })
            })
            .collect::<Result<Vec<_>, ForYouError>>()?;

        Ok(Self {
            categories,
            modifiers,
            protective: compile(PROTECTIVE_PATTERNS)?,
            handoff: compile(HANDOFF_PATTERNS)?,
        })
    }

    /// Scores a message and maps it onto the four-tag contract.
    pub fn assess(&self, text: &str) -> Assessment {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return Assessment::low_default();
        }

        let mut score = 0.0;
        let mut matched = Vec::new();

        for category in &self.categories {
            let hits = category
                .patterns
                .iter()
                .filter(|p| p.is_match(&text))
                .count();
            if hits > 0 {
                score += category.weight * hits as f64;
                matched.push(category.name);
            }
        }

        // Contextual modifiers: the first matching pattern of each modifier
        // group applies its multiplier once.
        for modifier in &self.modifiers {
            if modifier.patterns.iter().any(|p| p.is_match(&text)) {
                score *= modifier.multiplier;
                debug!(modifier = modifier.name, "context modifier applied");
            }
        }

        // Protective factors reduce the score, floored at zero.
        let credit = self
            .protective
            .iter()
            .filter(|p| p.is_match(&text))
            .count() as f64
            * PROTECTIVE_CREDIT;
        if credit > 0.0 {
            score = (score - credit).max(0.0);
        }

        score = score.min(1.0);

        let (level, confidence) = if score >= 0.8 {
            (RiskLevel::Critical, 0.9)
        } else if score >= 0.6 {
            (RiskLevel::High, 0.85)
        } else if score >= 0.3 {
            (RiskLevel::Moderate, 0.75)
        } else {
            (RiskLevel::Low, 0.7)
        };

        Assessment {
            level,
            score,
            confidence,
            matched_categories: matched,
        }
    }
}

#[async_trait]
impl PluginAdapter for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
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
impl RiskClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<RawClassification, ForYouError> {
        let assessment = self.assess(text);
        debug!(
            level = %assessment.level,
            score = assessment.score,
            "message classified"
        );
        Ok(RawClassification {
            tag: assessment.level.to_string(),
            confidence: assessment.confidence,
        })
    }

    fn is_handoff_request(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.handoff.iter().any(|p| p.is_match(&text))
    }
}
