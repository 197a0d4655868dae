// SPDX-FileCopyrightText: 2026 ForYou Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the ForYou triage core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! sessions, messages, triage records, and the escalation queue. The queue's
//! claim is a status-guarded conditional update, which is what makes
//! volunteer claims race-free.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
mod test_support;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::*;
