//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and metadata APIs over `documents` / `document_meta`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Document::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing order is insertion order, so "first match" is stable.

use crate::db::{require_current_schema, DbError};
use crate::model::document::{Document, DocumentId, DocumentValidationError, PublishStatus};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    d.uuid,
    d.title,
    d.content,
    d.status,
    d.parent_uuid,
    d.is_deleted
FROM documents d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document and settings persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(DocumentValidationError),
    Db(DbError),
    NotFound(DocumentId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DocumentValidationError> for RepoError {
    fn from(value: DocumentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Metadata predicate for document listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaFilter {
    pub key: String,
    /// `None` matches any value as long as the key is present.
    pub value: Option<String>,
}

impl MetaFilter {
    pub fn has_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// Query options for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentListQuery {
    pub meta: Option<MetaFilter>,
    /// Exact, case-sensitive title match.
    pub title: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Document store contract consumed by generation, reconciliation and
/// deletion services.
pub trait DocumentRepository {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId>;
    fn update_document(&self, document: &Document) -> RepoResult<()>;
    fn get_document(&self, id: DocumentId, include_deleted: bool) -> RepoResult<Option<Document>>;
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>>;
    /// Permanent deletes remove the row and its metadata; otherwise the
    /// document is tombstoned.
    fn delete_document(&self, id: DocumentId, permanent: bool) -> RepoResult<()>;
    /// Appends a metadata entry, keeping existing values for the same key.
    fn add_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()>;
    /// Replaces every value stored under `key` with a single `value`.
    fn set_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()>;
    /// Returns the earliest value stored under `key`.
    fn get_meta(&self, id: DocumentId, key: &str) -> RepoResult<Option<String>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `Db(SchemaBehind | SchemaAhead)` when the connection was not opened
    ///   through `open_db` by this build.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        require_current_schema(conn)?;
        Ok(Self { conn })
    }

    fn ensure_exists(&self, id: DocumentId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId> {
        document.validate()?;

        self.conn.execute(
            "INSERT INTO documents (
                uuid,
                title,
                content,
                status,
                parent_uuid,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                document.id.to_string(),
                document.title.as_str(),
                document.content.as_str(),
                document.status.as_str(),
                document.parent_id.map(|id| id.to_string()),
                bool_to_int(document.is_deleted),
            ],
        )?;

        Ok(document.id)
    }

    fn update_document(&self, document: &Document) -> RepoResult<()> {
        document.validate()?;

        let changed = self.conn.execute(
            "UPDATE documents
             SET
                title = ?1,
                content = ?2,
                status = ?3,
                parent_uuid = ?4,
                is_deleted = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                document.title.as_str(),
                document.content.as_str(),
                document.status.as_str(),
                document.parent_id.map(|id| id.to_string()),
                bool_to_int(document.is_deleted),
                document.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(document.id));
        }

        Ok(())
    }

    fn get_document(&self, id: DocumentId, include_deleted: bool) -> RepoResult<Option<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE d.uuid = ?1
               AND (?2 = 1 OR d.is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }

        Ok(None)
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND d.is_deleted = 0");
        }

        if let Some(title) = query.title.as_ref() {
            sql.push_str(" AND d.title = ?");
            bind_values.push(Value::Text(title.clone()));
        }

        if let Some(meta) = query.meta.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM document_meta m
                    WHERE m.document_uuid = d.uuid
                      AND m.meta_key = ?",
            );
            bind_values.push(Value::Text(meta.key.clone()));
            if let Some(value) = meta.value.as_ref() {
                sql.push_str(" AND m.meta_value = ?");
                bind_values.push(Value::Text(value.clone()));
            }
            sql.push(')');
        }

        sql.push_str(" ORDER BY d.rowid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();

        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }

        Ok(documents)
    }

    fn delete_document(&self, id: DocumentId, permanent: bool) -> RepoResult<()> {
        let changed = if permanent {
            self.conn
                .execute("DELETE FROM documents WHERE uuid = ?1;", [id.to_string()])?
        } else {
            self.conn.execute(
                "UPDATE documents
                 SET
                    is_deleted = 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                [id.to_string()],
            )?
        };

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn add_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()> {
        self.ensure_exists(id)?;
        self.conn.execute(
            "INSERT INTO document_meta (document_uuid, meta_key, meta_value)
             VALUES (?1, ?2, ?3);",
            params![id.to_string(), key, value],
        )?;
        Ok(())
    }

    fn set_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()> {
        self.ensure_exists(id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM document_meta WHERE document_uuid = ?1 AND meta_key = ?2;",
            params![id.to_string(), key],
        )?;
        tx.execute(
            "INSERT INTO document_meta (document_uuid, meta_key, meta_value)
             VALUES (?1, ?2, ?3);",
            params![id.to_string(), key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_meta(&self, id: DocumentId, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT meta_value
                 FROM document_meta
                 WHERE document_uuid = ?1 AND meta_key = ?2
                 ORDER BY id ASC
                 LIMIT 1;",
                params![id.to_string(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "documents.uuid")?;

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<PublishStatus>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in documents.status"
        ))
    })?;

    let parent_id = match row.get::<_, Option<String>>("parent_uuid")? {
        Some(value) => Some(parse_uuid(&value, "documents.parent_uuid")?),
        None => None,
    };

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in documents.is_deleted"
            )));
        }
    };

    let document = Document {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        status,
        parent_id,
        is_deleted,
    };
    document.validate()?;
    Ok(document)
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

impl<T: DocumentRepository + ?Sized> DocumentRepository for &T {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId> {
        (**self).create_document(document)
    }

    fn update_document(&self, document: &Document) -> RepoResult<()> {
        (**self).update_document(document)
    }

    fn get_document(&self, id: DocumentId, include_deleted: bool) -> RepoResult<Option<Document>> {
        (**self).get_document(id, include_deleted)
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        (**self).list_documents(query)
    }

    fn delete_document(&self, id: DocumentId, permanent: bool) -> RepoResult<()> {
        (**self).delete_document(id, permanent)
    }

    fn add_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()> {
        (**self).add_meta(id, key, value)
    }

    fn set_meta(&self, id: DocumentId, key: &str, value: &str) -> RepoResult<()> {
        (**self).set_meta(id, key, value)
    }

    fn get_meta(&self, id: DocumentId, key: &str) -> RepoResult<Option<String>> {
        (**self).get_meta(id, key)
    }
}
