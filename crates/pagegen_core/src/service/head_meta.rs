//! Head metadata resolution for rendered pages.
//!
//! An external SEO provider wins when it has a non-empty value; otherwise
//! the `meta_title` / `meta_description` stored at generation time is used.

use crate::model::document::DocumentId;
use crate::model::provenance::{META_SEO_DESCRIPTION, META_SEO_TITLE};
use crate::render::sanitize::escape_html;
use crate::repo::document_repo::{DocumentRepository, RepoResult};
use log::warn;

/// External SEO metadata provider.
pub trait SeoMetaSource {
    fn title(&self, id: DocumentId) -> Option<String>;
    fn description(&self, id: DocumentId) -> Option<String>;
}

/// Provider that never has values; stored fallbacks always apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSeoSource;

impl SeoMetaSource for NoSeoSource {
    fn title(&self, _id: DocumentId) -> Option<String> {
        None
    }

    fn description(&self, _id: DocumentId) -> Option<String> {
        None
    }
}

/// Provider reading values another plugin stores as document metadata.
pub struct MetaKeySeoSource<R: DocumentRepository> {
    repo: R,
    title_key: String,
    description_key: String,
}

impl<R: DocumentRepository> MetaKeySeoSource<R> {
    pub fn new(repo: R, title_key: impl Into<String>, description_key: impl Into<String>) -> Self {
        Self {
            repo,
            title_key: title_key.into(),
            description_key: description_key.into(),
        }
    }

    fn read(&self, id: DocumentId, key: &str) -> Option<String> {
        match self.repo.get_meta(id, key) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=head_meta module=service status=error document={id} error_code=external_seo_read_failed error={err}"
                );
                None
            }
        }
    }
}

impl<R: DocumentRepository> SeoMetaSource for MetaKeySeoSource<R> {
    fn title(&self, id: DocumentId) -> Option<String> {
        self.read(id, &self.title_key)
    }

    fn description(&self, id: DocumentId) -> Option<String> {
        self.read(id, &self.description_key)
    }
}

/// Resolved `<head>` values for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl HeadMeta {
    /// Emits `<title>` and description tags, one per line, escaped.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(title) = self.title.as_deref() {
            out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        }
        if let Some(description) = self.description.as_deref() {
            out.push_str(&format!(
                "<meta name=\"description\" content=\"{}\">\n",
                escape_html(description)
            ));
        }
        out
    }
}

/// Resolves head metadata for `id`, external values first.
pub fn resolve_head_meta(
    repo: &impl DocumentRepository,
    external: &impl SeoMetaSource,
    id: DocumentId,
) -> RepoResult<HeadMeta> {
    let title = match non_empty(external.title(id)) {
        Some(value) => Some(value),
        None => non_empty(repo.get_meta(id, META_SEO_TITLE)?),
    };
    let description = match non_empty(external.description(id)) {
        Some(value) => Some(value),
        None => non_empty(repo.get_meta(id, META_SEO_DESCRIPTION)?),
    };
    Ok(HeadMeta { title, description })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
