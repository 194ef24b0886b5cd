//! CSV ingestion.
//!
//! # Responsibility
//! - Turn an uploaded delimited file into uniform, cleaned `Row` values.
//!
//! # Invariants
//! - Rows whose field count differs from the header count are dropped.
//! - Every emitted cell is valid UTF-8 without ASCII control characters.

pub mod normalizer;
