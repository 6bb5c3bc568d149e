//! Parsing for the tool's JSON map-dump documents.
//!
//! A dump is an ordered array of records, each holding the entry's key and
//! value as arrays of textual byte values: decimal (`"255"`) or hex with a
//! `0x` prefix (`"0xff"`). Record order is whatever the tool produced; no
//! re-sorting happens anywhere.

use serde::Deserialize;

/// One record of a map dump document.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpEntry {
    /// Key bytes, one textual byte value per element.
    pub key: Vec<String>,
    /// Value bytes, one textual byte value per element.
    pub value: Vec<String>,
}

/// A textual byte value that could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("invalid byte value {value:?} at index {index}")]
pub struct ByteDecodeError {
    /// The offending textual value.
    pub value: String,
    /// Position within the byte array.
    pub index: usize,
    /// Underlying parse failure.
    #[source]
    pub source: std::num::ParseIntError,
}

/// Parses a whole dump document into its records.
///
/// # Errors
///
/// Fails on malformed JSON or a document that is not an array of
/// key/value records.
pub fn parse_dump_document(doc: &[u8]) -> Result<Vec<DumpEntry>, serde_json::Error> {
    serde_json::from_slice(doc)
}

/// Decodes an array of textual byte values into raw bytes.
///
/// # Errors
///
/// Fails on the first element that is not a decimal or `0x`-prefixed hex
/// byte, identifying its position.
pub fn decode_byte_strings(fields: &[String]) -> Result<Vec<u8>, ByteDecodeError> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let parsed = match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
                Some(hex) => u8::from_str_radix(hex, 16),
                None => field.parse::<u8>(),
            };
            parsed.map_err(|source| ByteDecodeError {
                value: field.clone(),
                index,
                source,
            })
        })
        .collect()
}
