// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Risk-aware session and triage core for ForYou.
//!
//! This crate is the decision-making center of the support system:
//! - [`risk`] folds per-message classifier tags into a session-level risk
//!   with the anti-whiplash clamp;
//! - [`machine`] decides when to offer triage and manages each offer's
//!   lifecycle;
//! - [`handoff`] materializes accepted offers into escalation requests,
//!   exactly once;
//! - [`queue`] serves waiting requests to volunteers with race-free claims;
//! - [`session`] serializes each session's message pipeline and exposes the
//!   operation surface to the surrounding application;
//! - [`sweeper`] closes sessions idle beyond the configured timeout.

pub mod handoff;
pub mod machine;
pub mod queue;
pub mod risk;
pub mod session;
pub mod sweeper;

pub use handoff::EscalationHandoff;
pub use machine::{TriageDisposition, TriageMachine};
pub use queue::VolunteerQueue;
pub use risk::{RiskAggregator, RiskUpdate, fold_risk, parse_tag};
pub use session::{MessageOutcome, SessionManager, SessionWorker};
pub use sweeper::IdleSweeper;
