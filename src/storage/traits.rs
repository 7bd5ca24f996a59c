//! Deduplication store trait.

use crate::Result;
use crate::models::{Entry, EntryKey, StoreStats};

/// Trait for deduplication storage backends.
///
/// The store persists (fingerprint, payload, duplicate count) rows and is
/// the authoritative source for the duplicate-rate statistic. Every
/// operation touches at most one row and is atomic with respect to it.
pub trait DedupStore: Send + Sync {
    /// Records a submission.
    ///
    /// First sight of `key` creates an entry with a duplicate count of 0;
    /// every later sight increments the count by 1 and leaves the stored
    /// body untouched. Implementations must not lose increments under
    /// concurrent submissions of the same key, so this has to be a single
    /// atomic upsert rather than a read followed by a write.
    fn insert_or_increment(&self, key: &EntryKey, body: &str) -> Result<()>;

    /// Retrieves an entry by key. Does not mutate anything.
    fn get(&self, key: &EntryKey) -> Result<Option<Entry>>;

    /// Deletes an entry by key, reporting whether a row existed.
    fn delete(&self, key: &EntryKey) -> Result<bool>;

    /// Rekeys an entry: replaces its key and body and resets the duplicate
    /// count to 0, reporting whether the source row existed.
    ///
    /// Fails with [`crate::Error::KeyConflict`] when `new_key` already
    /// identifies a different row; nothing is merged or overwritten.
    fn update(&self, old_key: &EntryKey, new_key: &EntryKey, new_body: &str) -> Result<bool>;

    /// Returns the aggregate submission counters across all entries.
    fn statistics(&self) -> Result<StoreStats>;

    /// Returns the number of stored entries.
    fn count(&self) -> Result<u64>;

    /// Checks whether an entry exists.
    fn exists(&self, key: &EntryKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
