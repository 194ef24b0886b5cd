//! Reconciliation of CSV rows against previously generated documents.
//!
//! # Responsibility
//! - Re-render generated documents whose title matches a CSV row.
//! - Refresh the provenance bundle of every updated document.
//!
//! # Invariants
//! - Never creates documents; rows without a title match are skipped.
//! - Matching is exact title equality among generated documents, first
//!   stored match wins.
//! - Document identifiers are never changed by an update.
//! - Publication status is left as it is.

use crate::error::{PageGenError, PageGenResult};
use crate::fingerprint::Fingerprint;
use crate::ingest::normalizer::parse_csv_file;
use crate::model::document::{Document, DocumentId};
use crate::model::provenance::{META_GENERATED, META_ROW_FINGERPRINT, META_SOURCE_FILENAME};
use crate::model::row::Row;
use crate::render::sanitize::{sanitize_file_name, HtmlSanitizer, PostHtmlSanitizer};
use crate::render::template::TemplateRenderer;
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository, MetaFilter, RepoResult};
use crate::service::generation_service::{row_title, write_seo_fields};
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Instant;

/// Input for one reconciliation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub template_id: DocumentId,
    pub csv_path: PathBuf,
    pub source_filename: String,
    pub parent_id: Option<DocumentId>,
    /// Leave a matched document alone when its stored fingerprint, source
    /// label, parent and rendered body already equal the new ones.
    pub skip_unchanged: bool,
}

/// Outcome of one reconciliation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub source_label: String,
    /// Updated document ids in row order.
    pub updated: Vec<DocumentId>,
    /// Titled rows with no generated document of the same title.
    pub unmatched: usize,
    /// Rows without a usable title.
    pub skipped: usize,
    /// Matches left untouched by `skip_unchanged`.
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn summary(&self) -> String {
        format!(
            "Pages updated from {}: {} updated, {} unchanged, {} unmatched, {} skipped, {} failed.",
            self.source_label,
            self.updated.len(),
            self.unchanged,
            self.unmatched,
            self.skipped,
            self.failed
        )
    }
}

enum RowOutcome {
    Updated(DocumentId),
    Unchanged,
    Unmatched,
}

/// Reconciliation service over a document repository.
pub struct ReconcileService<R: DocumentRepository, H = PostHtmlSanitizer> {
    repo: R,
    renderer: TemplateRenderer<H>,
}

impl<R: DocumentRepository> ReconcileService<R, PostHtmlSanitizer> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            renderer: TemplateRenderer::new(),
        }
    }
}

impl<R: DocumentRepository, H: HtmlSanitizer> ReconcileService<R, H> {
    pub fn with_sanitizer(repo: R, sanitizer: H) -> Self {
        Self {
            repo,
            renderer: TemplateRenderer::with_sanitizer(sanitizer),
        }
    }

    /// Updates generated documents from the rows of a CSV file.
    ///
    /// # Errors
    /// - `TemplateNotFound` when `template_id` is not an active document.
    /// - `InvalidInput` when the CSV cannot be opened or has no headers.
    pub fn update(&self, request: &UpdateRequest) -> PageGenResult<ReconcileReport> {
        let started_at = Instant::now();
        info!(
            "event=reconcile module=service status=start template={}",
            request.template_id
        );

        let template = self
            .repo
            .get_document(request.template_id, false)?
            .ok_or(PageGenError::TemplateNotFound(request.template_id))
            .inspect_err(|_| {
                error!(
                    "event=reconcile module=service status=error error_code=template_not_found template={}",
                    request.template_id
                );
            })?;
        let rows = parse_csv_file(&request.csv_path)?;

        let mut report = ReconcileReport {
            source_label: sanitize_file_name(&request.source_filename),
            ..ReconcileReport::default()
        };

        for (index, row) in rows.iter().enumerate() {
            let Some(title) = row_title(row) else {
                report.skipped += 1;
                debug!("event=reconcile_row module=service status=skip row={index} reason=no_title");
                continue;
            };

            match self.reconcile_row(&template, request, &report.source_label, &title, row) {
                Ok(RowOutcome::Updated(document_id)) => {
                    debug!(
                        "event=reconcile_row module=service status=ok row={index} document={document_id}"
                    );
                    report.updated.push(document_id);
                }
                Ok(RowOutcome::Unchanged) => {
                    debug!("event=reconcile_row module=service status=skip row={index} reason=unchanged");
                    report.unchanged += 1;
                }
                Ok(RowOutcome::Unmatched) => {
                    debug!("event=reconcile_row module=service status=skip row={index} reason=no_match");
                    report.unmatched += 1;
                }
                Err(err) => {
                    error!(
                        "event=reconcile_row module=service status=error row={index} error_code=update_failed error={err}"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            "event=reconcile module=service status=ok template={} updated={} unchanged={} unmatched={} skipped={} failed={} duration_ms={}",
            template.id,
            report.updated.len(),
            report.unchanged,
            report.unmatched,
            report.skipped,
            report.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn reconcile_row(
        &self,
        template: &Document,
        request: &UpdateRequest,
        source_label: &str,
        title: &str,
        row: &Row,
    ) -> Result<RowOutcome, Box<dyn std::error::Error>> {
        let Some(mut document) = self.find_generated_by_title(title)? else {
            return Ok(RowOutcome::Unmatched);
        };

        let fingerprint = Fingerprint::of(row)?;
        let content = self.renderer.render(&template.content, row);

        if request.skip_unchanged
            && self.is_unchanged(&document, request, source_label, &fingerprint, &content)?
        {
            return Ok(RowOutcome::Unchanged);
        }

        document.title = title.to_string();
        document.content = content;
        document.parent_id = request.parent_id;
        self.repo.update_document(&document)?;

        self.repo
            .set_meta(document.id, META_SOURCE_FILENAME, source_label)?;
        self.repo
            .set_meta(document.id, META_ROW_FINGERPRINT, fingerprint.as_str())?;
        write_seo_fields(&self.repo, document.id, row)?;

        Ok(RowOutcome::Updated(document.id))
    }

    fn find_generated_by_title(&self, title: &str) -> RepoResult<Option<Document>> {
        let query = DocumentListQuery {
            meta: Some(MetaFilter::has_key(META_GENERATED)),
            title: Some(title.to_string()),
            limit: Some(1),
            ..DocumentListQuery::default()
        };
        Ok(self.repo.list_documents(&query)?.into_iter().next())
    }

    fn is_unchanged(
        &self,
        document: &Document,
        request: &UpdateRequest,
        source_label: &str,
        fingerprint: &Fingerprint,
        content: &str,
    ) -> RepoResult<bool> {
        if document.parent_id != request.parent_id || document.content != content {
            return Ok(false);
        }
        let stored_fingerprint = self
            .repo
            .get_meta(document.id, META_ROW_FINGERPRINT)?
            .map(Fingerprint::from_stored);
        let stored_label = self.repo.get_meta(document.id, META_SOURCE_FILENAME)?;
        Ok(stored_fingerprint.as_ref() == Some(fingerprint)
            && stored_label.as_deref() == Some(source_label))
    }
}
