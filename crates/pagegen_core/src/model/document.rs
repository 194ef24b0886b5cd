//! Document domain model.
//!
//! # Responsibility
//! - Define the canonical record for templates and generated pages.
//! - Validate structural invariants before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another document.
//! - `title` is non-empty after trimming.
//! - A document is never its own parent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for every stored document.
pub type DocumentId = Uuid;

/// Publication state of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Publicly visible.
    #[default]
    Publish,
    /// Saved but not visible.
    Draft,
    /// Awaiting review.
    Pending,
    /// Visible to privileged users only.
    Private,
}

impl PublishStatus {
    /// Stable string id used in storage and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
        }
    }
}

impl Display for PublishStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "publish" => Ok(Self::Publish),
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "private" => Ok(Self::Private),
            other => Err(format!(
                "unsupported publish status `{other}`; expected publish|draft|pending|private"
            )),
        }
    }
}

/// Canonical record for templates and generated pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Rendered HTML body (or the raw template body for templates).
    pub content: String,
    pub status: PublishStatus,
    pub parent_id: Option<DocumentId>,
    /// Soft delete tombstone; permanent deletes remove the row instead.
    pub is_deleted: bool,
}

impl Document {
    /// Creates a published, top-level document with a generated stable ID.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, content)
    }

    /// Creates a document with a caller-provided stable ID.
    pub fn with_id(id: DocumentId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            status: PublishStatus::default(),
            parent_id: None,
            is_deleted: false,
        }
    }

    /// Checks structural invariants that storage relies on.
    pub fn validate(&self) -> Result<(), DocumentValidationError> {
        if self.title.trim().is_empty() {
            return Err(DocumentValidationError::EmptyTitle);
        }
        if self.parent_id == Some(self.id) {
            return Err(DocumentValidationError::ParentIsSelf(self.id));
        }
        Ok(())
    }

    /// Returns whether this document is visible (not tombstoned).
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Structural validation failures for documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentValidationError {
    EmptyTitle,
    ParentIsSelf(DocumentId),
}

impl Display for DocumentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "document title must not be empty"),
            Self::ParentIsSelf(id) => write!(f, "document {id} cannot be its own parent"),
        }
    }
}

impl Error for DocumentValidationError {}
