//! Ordered CSV row mapping.
//!
//! # Responsibility
//! - Hold one data line as column name -> cell value pairs.
//! - Serialize as a JSON object whose keys keep column order, so hashing is
//!   order-sensitive.
//!
//! # Invariants
//! - Keys are unique; inserting an existing key replaces the value in place
//!   and keeps the original position.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Mandatory column for a row to produce a document.
pub const TITLE_FIELD: &str = "title";
/// Optional column mapped to the stored SEO title.
pub const META_TITLE_FIELD: &str = "meta_title";
/// Optional column mapped to the stored SEO description.
pub const META_DESCRIPTION_FIELD: &str = "meta_description";

/// One CSV data line keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an existing value without moving it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw `title` cell, if the column exists.
    pub fn title(&self) -> Option<&str> {
        self.get(TITLE_FIELD)
    }

    pub fn meta_title(&self) -> Option<&str> {
        self.get(META_TITLE_FIELD)
    }

    pub fn meta_description(&self) -> Option<&str> {
        self.get(META_DESCRIPTION_FIELD)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
