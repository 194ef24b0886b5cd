//! Connection bootstrap for the page store.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`, checked after setting it,
//!   because `document_meta` relies on cascading deletes.
//! - Returned connections report `SchemaStatus::Current`.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Target<'a> {
    File(&'a Path),
    Memory,
}

impl Target<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating if needed) a page-store file and migrates it.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open(Target::File(path.as_ref()))
}

/// Opens a throwaway in-memory page store. Used by tests.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open(Target::Memory)
}

fn open(target: Target<'_>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.label();

    let result = target
        .connect()
        .map_err(DbError::from)
        .and_then(|mut conn| prepare(&mut conn).map(|applied| (conn, applied)));

    match result {
        Ok((conn, applied)) => {
            info!(
                "event=db_open module=db status=ok mode={mode} migrations_applied={applied} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn prepare(conn: &mut Connection) -> DbResult<usize> {
    conn.pragma_update(None, "foreign_keys", true)?;
    let enforced: bool = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
    if !enforced {
        return Err(DbError::PragmaRejected("foreign_keys"));
    }
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
