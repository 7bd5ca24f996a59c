//! Storage layer for deduplication entries.
//!
//! A single `SQLite` table is the authoritative record of every fingerprint
//! seen so far and how often each one was resubmitted. The [`DedupStore`]
//! trait keeps the service layer decoupled from the engine;
//! [`SqliteDedupStore`] is the shipped implementation.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod metrics;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteDedupStore;
pub use traits::DedupStore;
