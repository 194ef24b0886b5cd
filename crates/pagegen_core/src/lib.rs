//! Core logic for CSV-driven page generation.
//!
//! A template document's body is rendered once per CSV row by substituting
//! `{{column}}` placeholders. Generated documents carry provenance metadata
//! so later runs can update them in place or delete them in bulk.

pub mod access;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;

pub use access::capability::{parse_capability, Capability, CapabilityError, Principal};
pub use access::nonce::{ActionNonce, NonceVerifier, ACTION_DELETE_BY_SOURCE};
pub use error::{PageGenError, PageGenResult};
pub use fingerprint::Fingerprint;
pub use ingest::normalizer::{parse_csv_file, parse_csv_reader, CsvError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::document::{Document, DocumentId, DocumentValidationError, PublishStatus};
pub use model::row::Row;
pub use render::sanitize::{HtmlSanitizer, PostHtmlSanitizer};
pub use render::template::TemplateRenderer;
pub use repo::document_repo::{
    DocumentListQuery, DocumentRepository, MetaFilter, RepoError, RepoResult,
    SqliteDocumentRepository,
};
pub use repo::settings_repo::{SettingsStore, SqliteSettingsStore};
pub use service::deletion_service::{DeletionReport, DeletionService};
pub use service::generation_service::{GenerateRequest, GenerationReport, GenerationService};
pub use service::head_meta::{
    resolve_head_meta, HeadMeta, MetaKeySeoSource, NoSeoSource, SeoMetaSource,
};
pub use service::preferences::Preferences;
pub use service::reconcile_service::{ReconcileReport, ReconcileService, UpdateRequest};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
