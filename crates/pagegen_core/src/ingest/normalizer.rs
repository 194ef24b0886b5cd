//! CSV normalizer.
//!
//! # Responsibility
//! - Read the header line and pair it with every well-formed data line.
//! - Clean every cell: trim, repair encoding, drop control characters and
//!   fold typographic punctuation to ASCII.
//!
//! # Invariants
//! - Headers are trimmed only; cells go through the full cleanup.
//! - Column order in each `Row` follows the header line.
//! - Normalizing an already clean ASCII value returns it unchanged.

use crate::model::row::Row;
use csv::{ByteRecord, ReaderBuilder};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Bytes removed from both ends of headers and cells.
const TRIM_BYTES: &[u8] = b" \t\n\r\0\x0B";

/// Normalizer failures. All of them abort the whole batch.
#[derive(Debug)]
pub enum CsvError {
    /// The file could not be opened.
    Open { path: PathBuf, source: std::io::Error },
    /// The file has no readable header line.
    Headers,
    /// The tokenizer failed while reading records.
    Read(csv::Error),
}

impl Display for CsvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "cannot open CSV file `{}`: {source}", path.display())
            }
            Self::Headers => write!(f, "Error reading CSV headers."),
            Self::Read(err) => write!(f, "cannot read CSV records: {err}"),
        }
    }
}

impl Error for CsvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Headers => None,
            Self::Read(err) => Some(err),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(value: csv::Error) -> Self {
        Self::Read(value)
    }
}

/// Parses a CSV file from disk.
///
/// # Errors
/// - `Open` when the file cannot be opened.
/// - `Headers` / `Read` as for [`parse_csv_reader`].
pub fn parse_csv_file(path: impl AsRef<Path>) -> Result<Vec<Row>, CsvError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| {
        error!("event=csv_parse module=ingest status=error error_code=csv_open_failed");
        CsvError::Open {
            path: path.to_path_buf(),
            source,
        }
    })?;
    parse_csv_reader(file)
}

/// Parses comma-delimited content from any reader.
///
/// The first record is the header line; every following record becomes a
/// `Row` when its field count equals the header count.
pub fn parse_csv_reader<R: Read>(reader: R) -> Result<Vec<Row>, CsvError> {
    let started_at = Instant::now();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut record = ByteRecord::new();
    let headers: Vec<String> = match reader.read_byte_record(&mut record) {
        Ok(true) => record.iter().map(normalize_header).collect(),
        Ok(false) => {
            error!("event=csv_parse module=ingest status=error error_code=csv_headers_missing");
            return Err(CsvError::Headers);
        }
        Err(err) => {
            error!("event=csv_parse module=ingest status=error error_code=csv_headers_unreadable");
            return Err(CsvError::Read(err));
        }
    };

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    while reader.read_byte_record(&mut record)? {
        if record.len() != headers.len() {
            dropped += 1;
            debug!(
                "event=csv_row_dropped module=ingest expected_fields={} actual_fields={}",
                headers.len(),
                record.len()
            );
            continue;
        }

        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, raw)| (header.clone(), normalize_field(raw)))
                .collect::<Row>(),
        );
    }

    info!(
        "event=csv_parse module=ingest status=ok columns={} rows={} dropped={} duration_ms={}",
        headers.len(),
        rows.len(),
        dropped,
        started_at.elapsed().as_millis()
    );
    Ok(rows)
}

/// Cleans one header cell. Headers are only trimmed.
pub fn normalize_header(raw: &[u8]) -> String {
    String::from_utf8_lossy(trim_bytes(raw)).into_owned()
}

/// Cleans one data cell.
///
/// Steps, in order: trim, decode (UTF-8, else Latin-1), strip ASCII control
/// characters, replace typographic punctuation with ASCII.
pub fn normalize_field(raw: &[u8]) -> String {
    let decoded = decode_utf8_or_latin1(trim_bytes(raw));
    let mut cleaned = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        match ch {
            '\u{0}'..='\u{1F}' | '\u{7F}' => {}
            '\u{2018}' | '\u{2019}' => cleaned.push('\''),
            '\u{201C}' | '\u{201D}' => cleaned.push('"'),
            '\u{2013}' | '\u{2014}' => cleaned.push('-'),
            '\u{2026}' => cleaned.push_str("..."),
            '\u{A0}' => cleaned.push(' '),
            other => cleaned.push(other),
        }
    }
    cleaned
}

fn trim_bytes(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|byte| !TRIM_BYTES.contains(byte))
        .unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|byte| !TRIM_BYTES.contains(byte))
        .map_or(start, |index| index + 1);
    &raw[start..end]
}

fn decode_utf8_or_latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}
