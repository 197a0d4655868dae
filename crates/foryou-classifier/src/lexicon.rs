// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern tables for the keyword risk classifier.
//!
//! Weights and thresholds are heuristic constants of this default
//! implementation, not part of the classifier contract. The stable contract
//! is the four-tag output; any scoring scheme behind it is swappable.

use foryou_core::types::RiskLevel;

/// A category of risk signals sharing a weight and nominal level.
pub(crate) struct RiskCategory {
    pub name: &'static str,
    pub level: RiskLevel,
    pub weight: f64,
    pub patterns: &'static [&'static str],
}

pub(crate) const RISK_CATEGORIES: &[RiskCategory] = &[
    RiskCategory {
        name: "suicidal_ideation",
        level: RiskLevel::Critical,
        weight: 0.9,
        patterns: &[
            r"(want|plan|planning|going|thinking of|tried|trying) to (die|kill myself|end my life)",
            r"end it all",
            r"suicid(e|al)",
            r"better off dead",
            r"overdose",
            r"can't go on living",
            r"world would be better without me",
            r"no reason to live",
        ],
    },
    RiskCategory {
        name: "self_harm",
        level: RiskLevel::High,
        weight: 0.7,
        patterns: &[
            r"cut(ting)? myself",
            r"hurt(ing)? myself",
            r"self[- ]harm",
            r"burn(ing)? myself",
            r"scratch until i bleed",
            r"cuts on my arm",
        ],
    },
    RiskCategory {
        name: "hopelessness",
        level: RiskLevel::High,
        weight: 0.6,
        patterns: &[
            r"no hope",
            r"hopeless",
            r"never gets? better",
            r"no way out",
            r"worthless",
            r"useless",
            r"no future",
            r"lost forever",
        ],
    },
    RiskCategory {
        name: "severe_depression",
        level: RiskLevel::Moderate,
        weight: 0.5,
        patterns: &[
            r"deep depression",
            r"completely empty",
            r"total darkness",
            r"feel nothing",
            r"dead inside",
            r"no energy for anything",
            r"can't get out of bed",
            r"lost all meaning",
        ],
    },
    RiskCategory {
        name: "isolation",
        level: RiskLevel::Moderate,
        weight: 0.4,
        patterns: &[
            r"completely alone",
            r"nobody understands",
            r"everyone (has )?abandoned me",
            r"i have no one",
            r"cut off from the world",
            r"no one cares",
        ],
    },
    RiskCategory {
        name: "anxiety_panic",
        level: RiskLevel::Moderate,
        weight: 0.3,
        patterns: &[
            r"panic attack",
            r"can't breathe",
            r"heart (is )?racing",
            r"extreme fear",
            r"constant terror",
            r"paralyzing anxiety",
        ],
    },
];

/// A contextual modifier amplifying the raw score when present.
pub(crate) struct ContextModifier {
    pub name: &'static str,
    pub multiplier: f64,
    pub patterns: &'static [&'static str],
}

pub(crate) const CONTEXT_MODIFIERS: &[ContextModifier] = &[
    ContextModifier {
        name: "time_urgency",
        multiplier: 1.3,
        patterns: &[r"right now", r"tonight", r"today", r"tomorrow"],
    },
    ContextModifier {
        name: "specific_plan",
        multiplier: 1.5,
        patterns: &[
            r"i have a plan",
            r"already (chosen|decided)",
            r"i('m| am) going to do it",
        ],
    },
    ContextModifier {
        name: "previous_attempts",
        multiplier: 1.2,
        patterns: &[r"tried (it )?before", r"last time", r"once again"],
    },
];

/// Signals of resilience; each match reduces the score.
pub(crate) const PROTECTIVE_PATTERNS: &[&str] = &[
    // support system
    r"my family",
    r"my friends",
    r"my therapist",
    r"people who love me",
    r"don't want to hurt them",
    r"i have responsibilities",
    // hope
    r"maybe it (will|can) get better",
    r"i('ll| will) try",
    r"seek(ing)? help",
    r"not giving up",
    r"strength to keep going",
    r"one day at a time",
    // treatment
    r"taking (my )?medication",
    r"in therapy",
    r"getting treatment",
    r"psychologist",
    r"psychiatrist",
    r"seeing a doctor",
];

/// Score credit per matched protective pattern.
pub(crate) const PROTECTIVE_CREDIT: f64 = 0.2;

/// Explicit requests to be connected to a human volunteer.
pub(crate) const HANDOFF_PATTERNS: &[&str] = &[
    r"talk (to|with) (a )?(volunteer|human|real person|person)",
    r"speak (to|with) (a )?(volunteer|human|real person|person)",
    r"connect me (to|with)",
    r"forward me",
    r"can i talk to someone",
    r"i (need|want) (to talk to )?a (person|human|volunteer)",
    r"changed my mind.*(volunteer|human|forward)",
];
