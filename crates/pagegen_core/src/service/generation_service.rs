//! Page generation use-case service.
//!
//! # Responsibility
//! - Create one document per CSV row from a template body.
//! - Attach the provenance bundle and optional SEO fields to each document.
//!
//! # Invariants
//! - Template and CSV failures abort the batch before any write.
//! - Row-level failures are logged and counted; later rows still run.
//! - Rows without a non-empty sanitized `title` never produce a document.

use crate::error::{PageGenError, PageGenResult};
use crate::fingerprint::Fingerprint;
use crate::ingest::normalizer::parse_csv_file;
use crate::model::document::{Document, DocumentId, PublishStatus};
use crate::model::provenance::{
    GENERATED_FLAG_VALUE, META_GENERATED, META_ROW_FINGERPRINT, META_SEO_DESCRIPTION,
    META_SEO_TITLE, META_SOURCE_FILENAME,
};
use crate::model::row::Row;
use crate::render::sanitize::{
    sanitize_file_name, sanitize_text_field, HtmlSanitizer, PostHtmlSanitizer,
};
use crate::render::template::TemplateRenderer;
use crate::repo::document_repo::{DocumentRepository, RepoResult};
use crate::service::preferences::Preferences;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Input for one generation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub template_id: DocumentId,
    pub csv_path: PathBuf,
    pub status: PublishStatus,
    /// Original upload name; stored sanitized as the source label.
    pub source_filename: String,
    pub parent_id: Option<DocumentId>,
}

/// Outcome of one generation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Sanitized source label stored on every created document.
    pub source_label: String,
    /// Created document ids in row order.
    pub created: Vec<DocumentId>,
    /// Rows without a usable title.
    pub skipped: usize,
    /// Rows whose document or provenance write failed.
    pub failed: usize,
    /// Preferences updated with the template used by this batch.
    pub preferences: Preferences,
}

impl GenerationReport {
    /// One-line banner text for the whole batch.
    pub fn summary(&self) -> String {
        format!(
            "Pages generated from {}: {} created, {} skipped, {} failed.",
            self.source_label,
            self.created.len(),
            self.skipped,
            self.failed
        )
    }
}

/// Generation service over a document repository.
pub struct GenerationService<R: DocumentRepository, H = PostHtmlSanitizer> {
    repo: R,
    renderer: TemplateRenderer<H>,
}

impl<R: DocumentRepository> GenerationService<R, PostHtmlSanitizer> {
    /// Creates a service with the default post-body sanitizer.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            renderer: TemplateRenderer::new(),
        }
    }
}

impl<R: DocumentRepository, H: HtmlSanitizer> GenerationService<R, H> {
    pub fn with_sanitizer(repo: R, sanitizer: H) -> Self {
        Self {
            repo,
            renderer: TemplateRenderer::with_sanitizer(sanitizer),
        }
    }

    /// Generates one document per titled row of the CSV file.
    ///
    /// # Errors
    /// - `TemplateNotFound` when `template_id` is not an active document.
    /// - `InvalidInput` when the CSV cannot be opened or has no headers.
    /// - `Persistence` when the template lookup itself fails.
    pub fn generate(&self, request: &GenerateRequest) -> PageGenResult<GenerationReport> {
        let started_at = Instant::now();
        info!(
            "event=generate module=service status=start template={}",
            request.template_id
        );

        let template = self
            .repo
            .get_document(request.template_id, false)?
            .ok_or(PageGenError::TemplateNotFound(request.template_id))
            .inspect_err(|_| {
                error!(
                    "event=generate module=service status=error error_code=template_not_found template={}",
                    request.template_id
                );
            })?;
        let rows = parse_csv_file(&request.csv_path)?;

        let mut report = GenerationReport {
            source_label: sanitize_file_name(&request.source_filename),
            created: Vec::new(),
            skipped: 0,
            failed: 0,
            preferences: Preferences::default().with_last_template(template.id),
        };

        for (index, row) in rows.iter().enumerate() {
            let Some(title) = row_title(row) else {
                report.skipped += 1;
                debug!("event=generate_row module=service status=skip row={index} reason=no_title");
                continue;
            };

            let fingerprint = match Fingerprint::of(row) {
                Ok(fingerprint) => fingerprint,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=generate_row module=service status=error row={index} error_code=fingerprint_failed error={err}"
                    );
                    continue;
                }
            };

            let mut document = Document::new(title, self.renderer.render(&template.content, row));
            document.status = request.status;
            document.parent_id = request.parent_id;

            let document_id = match self.repo.create_document(&document) {
                Ok(id) => id,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=generate_row module=service status=error row={index} error_code=create_failed error={err}"
                    );
                    continue;
                }
            };
            report.created.push(document_id);

            if let Err(err) =
                self.attach_provenance(document_id, &report.source_label, &fingerprint, row)
            {
                report.failed += 1;
                warn!(
                    "event=generate_row module=service status=error row={index} document={document_id} error_code=provenance_failed error={err}"
                );
                continue;
            }

            debug!(
                "event=generate_row module=service status=ok row={index} document={document_id} fingerprint={fingerprint}"
            );
        }

        info!(
            "event=generate module=service status=ok template={} created={} skipped={} failed={} duration_ms={}",
            template.id,
            report.created.len(),
            report.skipped,
            report.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn attach_provenance(
        &self,
        document_id: DocumentId,
        source_label: &str,
        fingerprint: &Fingerprint,
        row: &Row,
    ) -> RepoResult<()> {
        self.repo
            .add_meta(document_id, META_GENERATED, GENERATED_FLAG_VALUE)?;
        self.repo
            .add_meta(document_id, META_SOURCE_FILENAME, source_label)?;
        self.repo
            .add_meta(document_id, META_ROW_FINGERPRINT, fingerprint.as_str())?;
        write_seo_fields(&self.repo, document_id, row)
    }
}

/// Sanitized, non-empty title of a row.
pub(crate) fn row_title(row: &Row) -> Option<String> {
    let title = sanitize_text_field(row.title()?);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Stores `meta_title` / `meta_description` cells when the columns exist.
pub(crate) fn write_seo_fields(
    repo: &impl DocumentRepository,
    document_id: DocumentId,
    row: &Row,
) -> RepoResult<()> {
    if let Some(value) = row.meta_title() {
        repo.set_meta(document_id, META_SEO_TITLE, &sanitize_text_field(value))?;
    }
    if let Some(value) = row.meta_description() {
        repo.set_meta(document_id, META_SEO_DESCRIPTION, &sanitize_text_field(value))?;
    }
    Ok(())
}
