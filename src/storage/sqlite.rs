//! `SQLite`-based deduplication store.
//!
//! Durable storage for fingerprint entries using a single `entries` table.
//! Every operation is one SQL statement, so each is atomic at the engine
//! level without explicit transactions; in particular insert-or-increment
//! is an upsert, never a read-then-write pair that could lose an increment
//! under concurrent submissions of the same fingerprint.

use crate::models::{Entry, EntryKey, StoreStats};
use crate::storage::metrics::record_operation_metrics;
use crate::storage::traits::DedupStore;
use crate::{Error, Result};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::instrument;

/// Helper to acquire the connection mutex with poison recovery.
///
/// If the mutex is poisoned by a panic in an earlier critical section, the
/// inner connection is still structurally valid, so we recover it and log
/// a warning instead of propagating the poison to every later request.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent request handling.
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: waits up to 5 seconds for locks instead of
///   failing immediately with `SQLITE_BUSY`
fn configure_connection(conn: &Connection) {
    // journal_mode returns a result row ("wal"), so pragma_update's return
    // value is ignored rather than treated as an error
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}

/// `SQLite`-backed [`DedupStore`].
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access because
/// `rusqlite::Connection` is not `Sync`. WAL mode and the `busy_timeout`
/// pragma keep contention graceful when another process shares the file.
/// The increment path needs no in-process coordination beyond the mutex:
/// the upsert is a single statement, so even two processes sharing the
/// database file cannot lose an update.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE entries (
///     key TEXT PRIMARY KEY,
///     body TEXT NOT NULL,
///     duplicate_count INTEGER NOT NULL DEFAULT 0 CHECK (duplicate_count >= 0)
/// )
/// ```
pub struct SqliteDedupStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteDedupStore {
    /// Creates a file-backed store, initializing the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use dupmeter::storage::SqliteDedupStore;
    ///
    /// let store = SqliteDedupStore::new("./entries.db")?;
    /// # Ok::<(), dupmeter::Error>(())
    /// ```
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::StorageUnavailable {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::StorageUnavailable {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        configure_connection(&conn);

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                duplicate_count INTEGER NOT NULL DEFAULT 0 CHECK (duplicate_count >= 0)
            )",
            [],
        )
        .map_err(|e| Error::StorageUnavailable {
            operation: "create_entries_table".to_string(),
            cause: e.to_string(),
        })?;

        Ok(())
    }
}

impl DedupStore for SqliteDedupStore {
    #[instrument(skip(self, body), fields(operation = "insert_or_increment", entry.key = %key.as_str()))]
    fn insert_or_increment(&self, key: &EntryKey, body: &str) -> Result<()> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            // One upsert statement: the conflict arm only touches the
            // counter, so the first-stored body always wins
            conn.execute(
                "INSERT INTO entries (key, body, duplicate_count) VALUES (?1, ?2, 0)
                 ON CONFLICT(key) DO UPDATE SET duplicate_count = duplicate_count + 1",
                params![key.as_str(), body],
            )
            .map_err(|e| Error::StorageUnavailable {
                operation: "insert_or_increment".to_string(),
                cause: e.to_string(),
            })?;

            Ok(())
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("insert_or_increment", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "get", entry.key = %key.as_str()))]
    fn get(&self, key: &EntryKey) -> Result<Option<Entry>> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            let row: Option<(String, String, i64)> = conn
                .query_row(
                    "SELECT key, body, duplicate_count FROM entries WHERE key = ?1",
                    params![key.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| Error::StorageUnavailable {
                    operation: "get_entry".to_string(),
                    cause: e.to_string(),
                })?;

            Ok(row.map(|(key, body, duplicate_count)| Entry {
                key: EntryKey::new(key),
                body,
                duplicate_count: u64::try_from(duplicate_count).unwrap_or(0),
            }))
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("get", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "delete", entry.key = %key.as_str()))]
    fn delete(&self, key: &EntryKey) -> Result<bool> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            let deleted = conn
                .execute("DELETE FROM entries WHERE key = ?1", params![key.as_str()])
                .map_err(|e| Error::StorageUnavailable {
                    operation: "delete_entry".to_string(),
                    cause: e.to_string(),
                })?;

            Ok(deleted > 0)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("delete", start, status);
        result
    }

    #[instrument(
        skip(self, new_body),
        fields(operation = "update", entry.old_key = %old_key.as_str(), entry.new_key = %new_key.as_str())
    )]
    fn update(&self, old_key: &EntryKey, new_key: &EntryKey, new_body: &str) -> Result<bool> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            // Rekeying onto an already-stored fingerprint violates the
            // primary key; that failure surfaces as KeyConflict and the
            // existing row is left untouched
            let updated = conn
                .execute(
                    "UPDATE entries SET key = ?1, body = ?2, duplicate_count = 0 WHERE key = ?3",
                    params![new_key.as_str(), new_body, old_key.as_str()],
                )
                .map_err(|e| match e {
                    rusqlite::Error::SqliteFailure(failure, _)
                        if failure.code == ErrorCode::ConstraintViolation =>
                    {
                        Error::KeyConflict {
                            key: new_key.as_str().to_string(),
                        }
                    },
                    other => Error::StorageUnavailable {
                        operation: "update_entry".to_string(),
                        cause: other.to_string(),
                    },
                })?;

            Ok(updated > 0)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("update", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "statistics"))]
    fn statistics(&self) -> Result<StoreStats> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            // Every entry contributes duplicate_count + 1 submissions;
            // only resubmitted entries count toward the duplicate tally
            let (total, duplicates): (i64, i64) = conn
                .query_row(
                    "SELECT COUNT(*) + COALESCE(SUM(duplicate_count), 0),
                            COALESCE(SUM(CASE WHEN duplicate_count > 0
                                             THEN duplicate_count + 1
                                             ELSE 0 END), 0)
                     FROM entries",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| Error::StorageUnavailable {
                    operation: "statistics".to_string(),
                    cause: e.to_string(),
                })?;

            Ok(StoreStats {
                total_submissions: u64::try_from(total).unwrap_or(0),
                duplicate_submissions: u64::try_from(duplicates).unwrap_or(0),
            })
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("statistics", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "count"))]
    fn count(&self) -> Result<u64> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);

            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
                .map_err(|e| Error::StorageUnavailable {
                    operation: "count_entries".to_string(),
                    cause: e.to_string(),
                })?;

            Ok(u64::try_from(count).unwrap_or(0))
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("count", start, status);
        result
    }
}
