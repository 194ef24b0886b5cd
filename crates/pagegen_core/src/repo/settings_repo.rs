//! Process-wide key/value settings.
//!
//! # Responsibility
//! - Persist small UI-convenience values (such as the last used template)
//!   outside of any single batch operation.
//!
//! # Invariants
//! - `get` never fails for a missing key; it returns the caller's default.

use crate::db::require_current_schema;
use crate::repo::document_repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Settings store contract.
pub trait SettingsStore {
    fn get(&self, key: &str, default: &str) -> RepoResult<String>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed settings store using the `settings` table.
pub struct SqliteSettingsStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        require_current_schema(conn)?;
        Ok(Self { conn })
    }
}

impl SettingsStore for SqliteSettingsStore<'_> {
    fn get(&self, key: &str, default: &str) -> RepoResult<String> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}
