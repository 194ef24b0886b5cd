//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate normalizer, renderer, fingerprinter and repository calls
//!   into batch operations.
//! - Keep the CLI decoupled from storage details.

pub mod deletion_service;
pub mod generation_service;
pub mod head_meta;
pub mod preferences;
pub mod reconcile_service;
