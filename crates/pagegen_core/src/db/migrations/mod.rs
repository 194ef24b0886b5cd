//! Page-store schema history.
//!
//! Each step is a named SQL script. Steps run in one transaction and the
//! highest applied version is written to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "documents",
        sql: include_str!("0001_documents.sql"),
    },
    SchemaStep {
        version: 2,
        name: "settings",
        sql: include_str!("0002_settings.sql"),
    },
];

/// Where a connection's schema stands relative to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Current(u32),
    Behind { found: u32, required: u32 },
    Ahead { found: u32, supported: u32 },
}

/// Highest schema version this build knows how to create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

pub fn schema_status(conn: &Connection) -> DbResult<SchemaStatus> {
    let found = current_user_version(conn)?;
    let latest = latest_version();
    Ok(match found.cmp(&latest) {
        std::cmp::Ordering::Equal => SchemaStatus::Current(found),
        std::cmp::Ordering::Less => SchemaStatus::Behind {
            found,
            required: latest,
        },
        std::cmp::Ordering::Greater => SchemaStatus::Ahead {
            found,
            supported: latest,
        },
    })
}

/// Fails unless the connection is fully migrated. Repositories call this
/// from their constructors.
pub fn require_current_schema(conn: &Connection) -> DbResult<()> {
    match schema_status(conn)? {
        SchemaStatus::Current(_) => Ok(()),
        SchemaStatus::Behind { found, required } => Err(DbError::SchemaBehind { found, required }),
        SchemaStatus::Ahead { found, supported } => Err(DbError::SchemaAhead { found, supported }),
    }
}

/// Brings the schema up to `latest_version()`. Returns how many steps ran.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = match schema_status(conn)? {
        SchemaStatus::Current(_) => return Ok(0),
        SchemaStatus::Ahead { found, supported } => {
            return Err(DbError::SchemaAhead { found, supported })
        }
        SchemaStatus::Behind { found, .. } => found,
    };

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    for step in &pending {
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    Ok(pending.len())
}
