//! Bulk deletion of generated documents.
//!
//! # Responsibility
//! - Permanently remove every generated document (capability-gated).
//! - Permanently remove documents sourced from one CSV label (token-gated).
//! - List the distinct source labels available for deletion.
//!
//! # Invariants
//! - Authorization is checked before the store is queried.
//! - Deletes bypass the soft-delete tombstone.
//! - A failed delete is logged and counted; the batch continues.

use crate::access::capability::{Capability, Principal};
use crate::access::nonce::{check_nonce, NonceVerifier, ACTION_DELETE_BY_SOURCE};
use crate::error::PageGenResult;
use crate::model::document::Document;
use crate::model::provenance::{META_GENERATED, META_SOURCE_FILENAME};
use crate::render::sanitize::sanitize_file_name;
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository, MetaFilter};
use log::{error, info, warn};

/// Outcome of one deletion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Sanitized label for delete-by-source, `None` for delete-all.
    pub source_label: Option<String>,
    pub deleted: usize,
    pub failed: usize,
}

impl DeletionReport {
    pub fn summary(&self) -> String {
        match self.source_label.as_deref() {
            Some(label) => format!(
                "Pages from {label} deleted: {} deleted, {} failed.",
                self.deleted, self.failed
            ),
            None => format!(
                "All generated pages deleted: {} deleted, {} failed.",
                self.deleted, self.failed
            ),
        }
    }
}

/// Deletion service over a document repository.
pub struct DeletionService<R: DocumentRepository> {
    repo: R,
}

impl<R: DocumentRepository> DeletionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Deletes every document flagged as generated, whatever its source.
    ///
    /// # Errors
    /// - `Unauthorized` when `principal` lacks `manage_options`.
    /// - `Persistence` when the generated set cannot be listed.
    pub fn delete_all(&self, principal: &Principal) -> PageGenResult<DeletionReport> {
        if let Err(err) = principal.require(Capability::ManageOptions) {
            warn!("event=delete_all module=service status=error error_code=unauthorized");
            return Err(err);
        }

        let documents = self.repo.list_documents(&DocumentListQuery {
            meta: Some(MetaFilter::has_key(META_GENERATED)),
            include_deleted: true,
            ..DocumentListQuery::default()
        })?;

        let report = self.purge(&documents, None);
        info!(
            "event=delete_all module=service status=ok deleted={} failed={}",
            report.deleted, report.failed
        );
        Ok(report)
    }

    /// Deletes every document whose source label equals `filename` after
    /// sanitization.
    ///
    /// # Errors
    /// - `Unauthorized` when `token` is not valid for delete-by-source.
    /// - `Persistence` when the matching set cannot be listed.
    pub fn delete_by_source(
        &self,
        verifier: &impl NonceVerifier,
        token: &str,
        filename: &str,
    ) -> PageGenResult<DeletionReport> {
        if let Err(err) = check_nonce(verifier, ACTION_DELETE_BY_SOURCE, token) {
            warn!("event=delete_by_source module=service status=error error_code=invalid_nonce");
            return Err(err);
        }

        let label = sanitize_file_name(filename);
        let documents = self.repo.list_documents(&DocumentListQuery {
            meta: Some(MetaFilter::equals(META_SOURCE_FILENAME, label.as_str())),
            include_deleted: true,
            ..DocumentListQuery::default()
        })?;

        let report = self.purge(&documents, Some(label));
        info!(
            "event=delete_by_source module=service status=ok deleted={} failed={}",
            report.deleted, report.failed
        );
        Ok(report)
    }

    /// Distinct source labels of stored documents, in first-seen order.
    pub fn list_source_filenames(&self) -> PageGenResult<Vec<String>> {
        let documents = self.repo.list_documents(&DocumentListQuery {
            meta: Some(MetaFilter::has_key(META_SOURCE_FILENAME)),
            ..DocumentListQuery::default()
        })?;

        let mut labels: Vec<String> = Vec::new();
        for document in &documents {
            if let Some(label) = self.repo.get_meta(document.id, META_SOURCE_FILENAME)? {
                if !label.is_empty() && !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        Ok(labels)
    }

    fn purge(&self, documents: &[Document], source_label: Option<String>) -> DeletionReport {
        let mut report = DeletionReport {
            source_label,
            ..DeletionReport::default()
        };
        for document in documents {
            match self.repo.delete_document(document.id, true) {
                Ok(()) => report.deleted += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(
                        "event=delete_doc module=service status=error document={} error={err}",
                        document.id
                    );
                }
            }
        }
        report
    }
}
