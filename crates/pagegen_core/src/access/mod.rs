//! Authorization gates for destructive bulk operations.
//!
//! # Responsibility
//! - Model the capabilities a calling principal holds.
//! - Issue and verify per-action anti-forgery tokens.

pub mod capability;
pub mod nonce;
