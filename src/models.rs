//! Entry types and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Fingerprint key identifying a stored entry.
///
/// The raw URL-safe base64 string produced by the fingerprint engine.
/// URL-encoding for transport is applied at the HTTP layer only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKey(String);

impl EntryKey {
    /// Creates a new entry key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One stored payload record.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Fingerprint of the payload, primary key in storage.
    pub key: EntryKey,
    /// Canonical JSON text of the payload as first submitted.
    pub body: String,
    /// Resubmissions beyond the first. 0 means exactly one submission.
    pub duplicate_count: u64,
}

impl Entry {
    /// Returns the stored payload with the duplicate count merged in as a
    /// `duplicates` field.
    ///
    /// This is the shape the get endpoint responds with. The stored body is
    /// canonical JSON written by the fingerprint engine, so a parse failure
    /// here means the row was corrupted outside this service.
    pub fn merged_body(&self) -> Result<serde_json::Value> {
        let mut value: serde_json::Value =
            serde_json::from_str(&self.body).map_err(|e| Error::StorageUnavailable {
                operation: "decode entry body".to_string(),
                cause: e.to_string(),
            })?;
        let Some(fields) = value.as_object_mut() else {
            return Err(Error::StorageUnavailable {
                operation: "decode entry body".to_string(),
                cause: "stored body is not a JSON object".to_string(),
            });
        };
        fields.insert(
            "duplicates".to_string(),
            serde_json::Value::from(self.duplicate_count),
        );
        Ok(value)
    }
}

/// Aggregate submission counters across the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Every entry contributes `duplicate_count + 1`.
    pub total_submissions: u64,
    /// Entries with `duplicate_count >= 1` contribute `duplicate_count + 1`;
    /// never-resubmitted entries contribute nothing.
    pub duplicate_submissions: u64,
}

impl StoreStats {
    /// Percentage of all submissions that belong to a resubmitted
    /// fingerprint, rounded to 2 decimal places. 0 when the store is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duplicate_rate(&self) -> f64 {
        if self.total_submissions == 0 {
            return 0.0;
        }
        let rate = 100.0 * self.duplicate_submissions as f64 / self.total_submissions as f64;
        (rate * 100.0).round() / 100.0
    }
}
