//! SQLite store: the production implementation of every engine seam.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while a mover writes
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` to protect the undo log's referential integrity
//!
//! Per-post mutual exclusion is one `BEGIN IMMEDIATE` transaction per
//! post: the write lock is taken before the read half of the
//! read-modify-write, and released at commit.

pub mod forum;
pub mod migrations;
pub mod posts;
pub mod relationships;
pub mod schema;
pub mod tags;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store file path under a project root.
pub const STORE_RELATIVE_PATH: &str = ".corkboard/corkboard.db";

/// Handle over one store connection, implementing the engine's store
/// traits ([`crate::store::PostStore`], [`crate::store::TagCountStore`],
/// [`crate::store::RelationshipStore`], [`crate::store::Forum`]).
#[derive(Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Wrap an already-configured connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open an in-memory store with the full schema, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory store")?;
        migrations::migrate(&mut conn).context("apply store migrations")?;
        Ok(Self::new(conn))
    }

    /// The wall clock in microseconds, for row timestamps.
    pub(crate) fn now_us() -> i64 {
        chrono::Utc::now().timestamp_micros()
    }
}

/// Open (or create) the store under `project_root`, apply runtime pragmas,
/// and migrate the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(project_root: &Path) -> Result<SqliteStore> {
    let path = project_root.join(STORE_RELATIVE_PATH);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(&path)
        .with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(SqliteStore::new(conn))
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
