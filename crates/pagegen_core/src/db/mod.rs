//! Document-store bootstrap.
//!
//! # Responsibility
//! - Hand out SQLite connections whose schema matches this binary.
//! - Own the schema-version check shared by every repository.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A repository is only built on a connection reporting
//!   `SchemaStatus::Current`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{require_current_schema, schema_status, SchemaStatus};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The database was written by a newer `pagegen`.
    SchemaAhead { found: u32, supported: u32 },
    /// The connection skipped `open_db`, so pending migrations never ran.
    SchemaBehind { found: u32, required: u32 },
    /// A connection pragma the store depends on did not stick.
    PragmaRejected(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaAhead { found, supported } => write!(
                f,
                "page store schema v{found} was written by a newer pagegen (this build supports v{supported})"
            ),
            Self::SchemaBehind { found, required } => write!(
                f,
                "page store schema v{found} is older than required v{required}; open it with open_db"
            ),
            Self::PragmaRejected(pragma) => write!(f, "sqlite refused to enable `{pragma}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaAhead { .. } | Self::SchemaBehind { .. } | Self::PragmaRejected(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
