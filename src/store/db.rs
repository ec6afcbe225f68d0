// Vaultkeep - SQLite Database Management
//
// Owns the single connection to the backing store and the schema. The
// connection sits behind a mutex so one `Database` can be shared by every
// concurrent caller. Per-call cancellation is wired through SQLite's progress
// handler: each lock acquisition installs the caller's `AbortSignal` (or clears
// any previous one), so aborting one call never interrupts another caller's
// statement.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use super::StoreError;

/// VM instructions between progress-handler polls.
const PROGRESS_POLL_OPS: i32 = 1_000;

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Abort Signal ────────────────────────────────────────────────────────────

/// A per-call flag that interrupts the in-flight statement once raised.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ─── Database ────────────────────────────────────────────────────────────────

/// Wrapper around the SQLite connection backing both stores.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;

        tracing::debug!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Contents vanish when it is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Lock the connection with no cancellation hook.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn_abortable(None)
    }

    /// Lock the connection for one call. When `abort` is given, raising it
    /// interrupts whatever statement this guard is running.
    pub fn conn_abortable(
        &self,
        abort: Option<&AbortSignal>,
    ) -> Result<MutexGuard<'_, Connection>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Other("database connection lock poisoned".to_string()))?;

        match abort {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(StoreError::Cancelled);
                }
                let flag = Arc::clone(&signal.flag);
                conn.progress_handler(
                    PROGRESS_POLL_OPS,
                    Some(move || flag.load(Ordering::SeqCst)),
                );
            }
            None => conn.progress_handler(0, None::<fn() -> bool>),
        }

        Ok(conn)
    }

    /// Run schema migrations to create or update tables.
    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
                id          TEXT PRIMARY KEY,
                owner       TEXT NOT NULL,
                title       TEXT NOT NULL,
                username    TEXT NOT NULL,
                secret      BLOB NOT NULL,
                notes       TEXT,
                folder      TEXT,
                domain      TEXT,
                tags        TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_owner
                ON entries(owner);

            CREATE TABLE IF NOT EXISTS users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL,
                username    TEXT NOT NULL UNIQUE,
                credential  BLOB NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            ",
        )?;

        tracing::debug!("Database migrations completed successfully");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
