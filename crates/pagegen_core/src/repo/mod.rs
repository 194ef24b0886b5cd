//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document-store and settings-store contracts used by services.
//! - Isolate SQLite query details from generation/reconciliation logic.
//!
//! # Invariants
//! - Document writes enforce `Document::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod document_repo;
pub mod settings_repo;
