//! Metadata keys attached to generated documents.
//!
//! Generated documents carry a provenance bundle so later runs can find them
//! again: the generated flag, the source CSV label and a row fingerprint.
//! SEO fields from optional CSV columns live next to them.

/// Present (value `1`) on every document this system created.
pub const META_GENERATED: &str = "_pagegen_generated";
/// Sanitized label of the CSV file a document was last written from.
pub const META_SOURCE_FILENAME: &str = "_pagegen_source_filename";
/// Fingerprint of the row a document was last rendered from.
pub const META_ROW_FINGERPRINT: &str = "_pagegen_row_fingerprint";
/// Fallback `<title>` value.
pub const META_SEO_TITLE: &str = "_pagegen_meta_title";
/// Fallback `<meta name="description">` value.
pub const META_SEO_DESCRIPTION: &str = "_pagegen_meta_description";

/// Stored value of the generated flag.
pub const GENERATED_FLAG_VALUE: &str = "1";
