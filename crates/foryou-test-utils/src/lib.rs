// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for ForYou integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockClassifier`] - scripted risk classifier with failure injection
//! - [`MockDirectory`] - volunteer directory with an explicit eligible set
//! - [`TestHarness`] - full stack on a temp database

pub mod harness;
pub mod mock_classifier;
pub mod mock_directory;

pub use harness::TestHarness;
pub use mock_classifier::MockClassifier;
pub use mock_directory::MockDirectory;

// Re-export the triage dispositions returned by the harness so colocated
// tests in `foryou-triage` name the same type instance the harness yields
// (the harness links the non-test build of `foryou-triage`).
pub use foryou_triage::TriageDisposition;
