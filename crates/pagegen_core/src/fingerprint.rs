//! Row fingerprints for change tracking.
//!
//! A fingerprint is the lowercase hex SHA-256 of the row serialized as a JSON
//! object whose keys keep column order. Same keys, values and order give the
//! same fingerprint; reordering columns changes it.

use crate::model::row::Row;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

/// Hex digest identifying one row's full field set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of `row`.
    pub fn of(row: &Row) -> serde_json::Result<Self> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(&mut hasher, row)?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Wraps a previously stored digest.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
