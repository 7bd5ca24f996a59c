//! Deduplication service.
//!
//! Composes the fingerprint engine with the store behind the small
//! operation contract the HTTP layer calls into. The storage handle is
//! injected at construction, so the binary and the tests can wire any
//! [`DedupStore`] implementation without a process-wide singleton.

use std::sync::Arc;

use tracing::debug;

use crate::fingerprint::FlatPayload;
use crate::models::{Entry, EntryKey, StoreStats};
use crate::storage::DedupStore;
use crate::{Error, Result};

/// Service wiring payload fingerprinting to the deduplication store.
pub struct DedupService {
    /// Injected storage handle.
    store: Arc<dyn DedupStore>,
}

impl DedupService {
    /// Creates a new deduplication service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self { store }
    }

    /// Records a submission and returns its fingerprint.
    ///
    /// Validates the raw body as a flat JSON object, derives its key, and
    /// inserts or increments the matching entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The body is not a flat JSON object ([`Error::InvalidPayload`])
    /// - Storage fails ([`Error::StorageUnavailable`])
    pub fn submit(&self, raw: &[u8]) -> Result<EntryKey> {
        let payload = FlatPayload::parse(raw)?;
        let key = payload.fingerprint();
        self.store
            .insert_or_increment(&key, payload.canonical_text())?;
        debug!(key = %key, "submission recorded");
        Ok(key)
    }

    /// Fetches the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry exists for the key.
    pub fn fetch(&self, key: &EntryKey) -> Result<Entry> {
        self.store.get(key)?.ok_or_else(|| Error::NotFound {
            key: key.as_str().to_string(),
        })
    }

    /// Removes the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry exists for the key.
    pub fn remove(&self, key: &EntryKey) -> Result<()> {
        if self.store.delete(key)? {
            debug!(key = %key, "entry removed");
            Ok(())
        } else {
            Err(Error::NotFound {
                key: key.as_str().to_string(),
            })
        }
    }

    /// Replaces the entry at `old_key` with a re-fingerprinted payload.
    ///
    /// The new body is validated and fingerprinted exactly like a fresh
    /// submission; the stored row is rekeyed onto the new fingerprint with
    /// its duplicate count reset to 0.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The body is not a flat JSON object ([`Error::InvalidPayload`])
    /// - No entry exists at `old_key` ([`Error::NotFound`])
    /// - The new fingerprint is already stored ([`Error::KeyConflict`])
    pub fn rekey(&self, old_key: &EntryKey, raw: &[u8]) -> Result<EntryKey> {
        let payload = FlatPayload::parse(raw)?;
        let new_key = payload.fingerprint();
        if self
            .store
            .update(old_key, &new_key, payload.canonical_text())?
        {
            debug!(old_key = %old_key, new_key = %new_key, "entry rekeyed");
            Ok(new_key)
        } else {
            Err(Error::NotFound {
                key: old_key.as_str().to_string(),
            })
        }
    }

    /// Returns the aggregate submission counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] when the aggregate query fails.
    pub fn statistics(&self) -> Result<StoreStats> {
        self.store.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteDedupStore;

    fn test_service() -> DedupService {
        DedupService::new(Arc::new(SqliteDedupStore::in_memory().unwrap()))
    }

    #[test]
    fn test_submit_returns_fingerprint_and_stores_canonical_body() {
        let service = test_service();

        let key = service.submit(br#"{ "a": 1, "b": 2 }"#).unwrap();
        assert_eq!(key.as_str(), "YTFiMg==");

        let entry = service.fetch(&key).unwrap();
        assert_eq!(entry.body, r#"{"a":1,"b":2}"#);
        assert_eq!(entry.duplicate_count, 0);
    }

    #[test]
    fn test_submit_twice_counts_a_duplicate() {
        let service = test_service();

        let first = service.submit(br#"{"a":1,"b":2}"#).unwrap();
        let second = service.submit(br#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(first, second);

        let entry = service.fetch(&first).unwrap();
        assert_eq!(entry.duplicate_count, 1);
    }

    #[test]
    fn test_submit_rejects_invalid_payloads() {
        let service = test_service();

        assert!(matches!(
            service.submit(b"not json"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            service.submit(br#"{"nested":{"x":1}}"#),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_fetch_missing_key_is_not_found() {
        let service = test_service();
        let err = service.fetch(&EntryKey::new("absent")).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref key } if key == "absent"));
    }

    #[test]
    fn test_remove_deletes_and_reports_missing() {
        let service = test_service();
        let key = service.submit(br#"{"a":1}"#).unwrap();

        service.remove(&key).unwrap();
        assert!(matches!(
            service.fetch(&key),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            service.remove(&key),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_rekey_moves_entry_and_resets_count() {
        let service = test_service();

        let old_key = service.submit(br#"{"a":1}"#).unwrap();
        service.submit(br#"{"a":1}"#).unwrap();
        service.submit(br#"{"a":1}"#).unwrap();

        let new_key = service.rekey(&old_key, br#"{"c":3}"#).unwrap();
        assert_ne!(old_key, new_key);

        let entry = service.fetch(&new_key).unwrap();
        assert_eq!(entry.body, r#"{"c":3}"#);
        assert_eq!(entry.duplicate_count, 0);
        assert!(matches!(
            service.fetch(&old_key),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_rekey_missing_source_is_not_found() {
        let service = test_service();
        let err = service
            .rekey(&EntryKey::new("absent"), br#"{"c":3}"#)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref key } if key == "absent"));
    }

    #[test]
    fn test_rekey_onto_existing_fingerprint_conflicts() {
        let service = test_service();

        let first = service.submit(br#"{"a":1}"#).unwrap();
        let second = service.submit(br#"{"b":2}"#).unwrap();

        let err = service.rekey(&first, br#"{"b":2}"#).unwrap_err();
        assert!(matches!(err, Error::KeyConflict { ref key } if key == second.as_str()));
    }

    #[test]
    fn test_statistics_reflect_submissions() {
        let service = test_service();

        service.submit(br#"{"a":1}"#).unwrap();
        service.submit(br#"{"a":1}"#).unwrap();
        service.submit(br#"{"b":2}"#).unwrap();

        let stats = service.statistics().unwrap();
        assert_eq!(stats.total_submissions, 3);
        assert_eq!(stats.duplicate_submissions, 2);
    }
}
