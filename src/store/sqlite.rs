//! Durable counter store on SQLite.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, instrument};

use crate::error::StoreError;

use super::{timeout_ms, CounterStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS counters (
        name  TEXT PRIMARY KEY NOT NULL,
        count INTEGER NOT NULL CHECK (count >= 0)
    );
";

// ?1 key, ?2 initial value for an absent key, ?3 increment, ?4 largest value
// that can still take the increment. The WHERE guard turns an overflowing
// update into "no row returned" instead of SQLite's silent promotion to REAL.
const INCREMENT: &str = "
    INSERT INTO counters (name, count) VALUES (?1, ?2)
    ON CONFLICT (name) DO UPDATE SET count = count + ?3
    WHERE count <= ?4
    RETURNING count
";

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Counter store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening sqlite counter store");
        let connection = Connection::open(path)?;
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.busy_timeout(BUSY_TIMEOUT)?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Set `key` to `value` unconditionally. Used to seed fixtures.
    pub fn seed(&self, key: &str, value: u64) -> Result<(), StoreError> {
        let value = to_sql_int(key, value)?;
        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO counters (name, count) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET count = excluded.count",
            params![key, value],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|err| {
            StoreError::Unavailable(format!("failed to acquire sqlite connection: {err}"))
        })
    }
}

fn to_sql_int(key: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Overflow {
        key: key.to_string(),
    })
}

/// Point in time after which an increment must not start.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout_ms: u64,
}

impl SqliteStore {
    async fn increment(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
        deadline: Option<Deadline>,
    ) -> Result<u64, StoreError> {
        let initial = default_if_absent
            .checked_add(increment_by)
            .ok_or_else(|| StoreError::Overflow {
                key: key.to_string(),
            })
            .and_then(|value| to_sql_int(key, value))?;
        let increment_by = to_sql_int(key, increment_by)?;
        let ceiling = i64::MAX - increment_by;

        let store = self.clone();
        let key = key.to_string();

        // The closure runs to completion even if the caller goes away, so the
        // deadline is enforced here: once it has passed the UPSERT never runs,
        // and the busy wait inside SQLite is capped at what is left of it.
        tokio::task::spawn_blocking(move || {
            let connection = store.lock()?;

            let busy_timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.at.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StoreError::Timeout {
                            timeout_ms: deadline.timeout_ms,
                        });
                    }
                    remaining.min(BUSY_TIMEOUT)
                }
                None => BUSY_TIMEOUT,
            };
            connection.busy_timeout(busy_timeout)?;

            let count: Option<i64> = connection
                .query_row(
                    INCREMENT,
                    params![key, initial, increment_by, ceiling],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| match (err.sqlite_error_code(), deadline) {
                    (Some(ErrorCode::DatabaseBusy), Some(deadline)) => StoreError::Timeout {
                        timeout_ms: deadline.timeout_ms,
                    },
                    _ => StoreError::Backend(err),
                })?;

            match count {
                Some(count) => u64::try_from(count).map_err(|_| StoreError::Corrupt {
                    key: key.clone(),
                    reason: format!("negative count {count}"),
                }),
                None => Err(StoreError::Overflow { key }),
            }
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("sqlite task failed: {err}")))?
    }
}

#[async_trait]
impl CounterStore for SqliteStore {
    #[instrument(skip(self), level = "debug")]
    async fn atomic_increment(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
    ) -> Result<u64, StoreError> {
        self.increment(key, increment_by, default_if_absent, None)
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn atomic_increment_within(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
        timeout: Duration,
    ) -> Result<u64, StoreError> {
        let deadline = Deadline {
            at: Instant::now() + timeout,
            timeout_ms: timeout_ms(timeout),
        };
        self.increment(key, increment_by, default_if_absent, Some(deadline))
            .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
