//! Template rendering and text sanitizers.
//!
//! # Responsibility
//! - Substitute `{{field}}` placeholders with sanitized row values.
//! - Provide the text/filename/HTML sanitizers applied before persistence.

pub mod sanitize;
pub mod template;
