//! Domain model for template-driven page generation.
//!
//! # Responsibility
//! - Define the document shape shared by templates and generated pages.
//! - Define the ordered CSV row mapping consumed by rendering and hashing.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId`.
//! - Row column order is preserved from the CSV header line.

pub mod document;
pub mod row;
pub mod provenance;
