//! Utility functions for cleaning legacy field values

use crate::migration::error::{MigrationError, Result};
use crate::migration::types::WriterId;
use serde::Deserialize;

/// Placeholders the legacy store uses for "no data"
pub const EMPTY_VALUES: [&str; 2] = ["N/A", ""];

/// Delimiter for multi-valued free-text fields (genre, director)
pub const NAME_DELIMITER: char = ',';

pub fn is_sentinel(value: &str) -> bool {
    EMPTY_VALUES.contains(&value)
}

/// Map sentinel values to `None`, keep everything else verbatim
pub fn none_if_sentinel(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_sentinel(v))
}

/// Split a multi-valued field like "Drama, War" into trimmed names.
/// Empty and sentinel segments are dropped.
pub fn split_names(value: &str) -> Vec<String> {
    value
        .split(NAME_DELIMITER)
        .map(str::trim)
        .filter(|name| !is_sentinel(name))
        .map(str::to_string)
        .collect()
}

/// One element of the serialized `writers` column
#[derive(Debug, Deserialize)]
struct WriterRef {
    id: WriterRefId,
}

/// Older dumps store writer ids as numbers, newer ones as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WriterRefId {
    Text(String),
    Number(i64),
}

impl From<WriterRefId> for WriterId {
    fn from(id: WriterRefId) -> Self {
        match id {
            WriterRefId::Text(s) => s,
            WriterRefId::Number(n) => n.to_string(),
        }
    }
}

/// Resolve a film's writer ids from either representation.
///
/// The serialized list in `writers` wins when present; otherwise the legacy
/// single `writer` column is used. A `writers` value that is present but not
/// a JSON list of `{"id": ...}` objects is an error for the film.
pub fn decode_writers(
    film_id: &str,
    writers: Option<&str>,
    legacy_writer: Option<&str>,
) -> Result<Vec<WriterId>> {
    if let Some(serialized) = writers.filter(|w| !is_sentinel(w)) {
        let refs: Vec<WriterRef> =
            serde_json::from_str(serialized).map_err(|e| MigrationError::MalformedSourceData {
                film_id: film_id.to_string(),
                field: "writers",
                reason: e.to_string(),
            })?;
        return Ok(refs.into_iter().map(|r| r.id.into()).collect());
    }

    Ok(legacy_writer
        .filter(|w| !is_sentinel(w))
        .map(|w| vec![w.to_string()])
        .unwrap_or_default())
}
