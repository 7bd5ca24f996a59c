//! # Dupmeter
//!
//! An HTTP service that deduplicates flat JSON payloads.
//!
//! Clients submit JSON objects with scalar-valued fields. Dupmeter derives a
//! deterministic fingerprint from each payload, stores the canonical payload
//! text keyed by that fingerprint in SQLite, and counts every resubmission
//! of an already-seen fingerprint. An aggregate endpoint reports the
//! duplicate rate across all submissions.
//!
//! ## Features
//!
//! - Order-sensitive payload fingerprinting (URL-safe base64, no hashing)
//! - Single-statement atomic insert-or-increment (no lost updates)
//! - Rekeying updates that reset the duplicate counter
//! - Aggregate duplicate-rate statistics computed in SQL
//! - axum HTTP API with JSON error pages
//!
//! ## Example
//!
//! ```rust,ignore
//! use dupmeter::{DedupService, SqliteDedupStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteDedupStore::in_memory()?);
//! let service = DedupService::new(store);
//! let key = service.submit(br#"{"user":"alice","action":"login"}"#)?;
//! let entry = service.fetch(&key)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
// Cannot be moved to function level. Current duplicates: axum/metrics-exporter http stacks.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod fingerprint;
pub mod http;
pub mod models;
pub mod observability;
pub mod service;
pub mod storage;

// Re-exports for convenience
pub use config::DupmeterConfig;
pub use fingerprint::FlatPayload;
pub use models::{Entry, EntryKey, StoreStats};
pub use service::DedupService;
pub use storage::{DedupStore, SqliteDedupStore};

/// Error type for dupmeter operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidPayload` | Malformed JSON, non-object payloads, nested field values |
/// | `NotFound` | Get/delete/update against a key with no stored entry |
/// | `KeyConflict` | Update rekeys an entry onto a fingerprint that already exists |
/// | `StorageUnavailable` | `SQLite` open, query, or transport failures |
/// | `Config` | Unreadable config files, double observability init, exporter setup failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The submitted payload cannot be fingerprinted.
    ///
    /// Raised when:
    /// - The request body is not valid JSON
    /// - The parsed JSON is not an object
    /// - Any field value is an array or a nested object
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No entry exists for the requested key.
    ///
    /// Raised when:
    /// - `get` finds no row for the fingerprint
    /// - `delete` removes zero rows
    /// - `update` matches zero source rows
    #[error("no entry for key '{key}'")]
    NotFound {
        /// The fingerprint that had no stored entry.
        key: String,
    },

    /// An update would rekey onto an already-stored fingerprint.
    ///
    /// Raised when:
    /// - The new payload's fingerprint collides with an existing row's
    ///   primary key (the operation fails; nothing is merged or overwritten)
    #[error("an entry already exists for key '{key}'")]
    KeyConflict {
        /// The fingerprint that is already present.
        key: String,
    },

    /// The storage engine could not complete an operation.
    ///
    /// Raised when:
    /// - Opening the `SQLite` database fails
    /// - A statement fails to prepare or execute
    /// - A stored body no longer parses as JSON
    #[error("storage operation '{operation}' failed: {cause}")]
    StorageUnavailable {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Process startup could not complete.
    ///
    /// Raised when:
    /// - A config file cannot be read or parsed
    /// - Observability is initialized twice
    /// - The metrics exporter fails to install
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for dupmeter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPayload("not an object".to_string());
        assert_eq!(err.to_string(), "invalid payload: not an object");

        let err = Error::NotFound {
            key: "YWIx".to_string(),
        };
        assert_eq!(err.to_string(), "no entry for key 'YWIx'");

        let err = Error::KeyConflict {
            key: "YWIx".to_string(),
        };
        assert_eq!(err.to_string(), "an entry already exists for key 'YWIx'");

        let err = Error::StorageUnavailable {
            operation: "get".to_string(),
            cause: "disk I/O error".to_string(),
        };
        assert_eq!(err.to_string(), "storage operation 'get' failed: disk I/O error");

        let err = Error::Config("missing config file".to_string());
        assert_eq!(err.to_string(), "configuration error: missing config file");
    }
}
