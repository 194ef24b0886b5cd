//! Placeholder substitution.
//!
//! # Invariants
//! - Substitution is literal string replacement of `{{key}}`, never regex.
//! - Keys are applied in row column order.
//! - Placeholders without a matching row key stay in the output verbatim.

use crate::model::row::Row;
use crate::render::sanitize::{HtmlSanitizer, PostHtmlSanitizer};

/// Renders template bodies against rows.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer<H = PostHtmlSanitizer> {
    sanitizer: H,
}

impl TemplateRenderer<PostHtmlSanitizer> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HtmlSanitizer> TemplateRenderer<H> {
    /// Uses a caller-provided sanitizer for cell values.
    pub fn with_sanitizer(sanitizer: H) -> Self {
        Self { sanitizer }
    }

    /// Replaces every `{{key}}` in `template` with the sanitized value of
    /// `key` in `row`.
    pub fn render(&self, template: &str, row: &Row) -> String {
        let mut content = template.to_string();
        for (key, value) in row.iter() {
            let token = placeholder(key);
            if content.contains(&token) {
                content = content.replace(&token, &self.sanitizer.sanitize(value));
            }
        }
        content
    }
}

/// Builds the literal token for a column name.
pub fn placeholder(key: &str) -> String {
    format!("{{{{{key}}}}}")
}
