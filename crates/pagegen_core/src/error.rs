//! Batch-level error kinds surfaced to callers.
//!
//! Only whole-operation failures appear here. Row-level persistence failures
//! during generation and reconciliation are logged and counted in the batch
//! report instead.

use crate::ingest::normalizer::CsvError;
use crate::model::document::DocumentId;
use crate::repo::document_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PageGenResult<T> = Result<T, PageGenError>;

#[derive(Debug)]
pub enum PageGenError {
    /// The CSV file is unreadable or has no header line.
    InvalidInput(CsvError),
    /// The template identifier does not resolve to a stored document.
    TemplateNotFound(DocumentId),
    /// A capability or anti-forgery check failed.
    Unauthorized(String),
    /// The document store rejected an operation the batch cannot skip.
    Persistence(RepoError),
}

impl Display for PageGenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::Unauthorized(reason) => write!(f, "unauthorized: {reason}"),
            Self::Persistence(err) => write!(f, "persistence error: {err}"),
        }
    }
}

impl Error for PageGenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::TemplateNotFound(_) | Self::Unauthorized(_) => None,
        }
    }
}

impl From<CsvError> for PageGenError {
    fn from(value: CsvError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<RepoError> for PageGenError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}
