//! Conversions between SQLite column values and model types.

use std::str::FromStr;

use jiff::{civil::Date, Timestamp};
use rusqlite::{types::Type, Row};

use crate::{
    error::{Result, TrackerError},
    models::{IdKind, RecordId},
};

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

/// Reads a required RFC 3339 timestamp column.
pub(super) fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(idx)?
        .parse::<Timestamp>()
        .map_err(|e| conversion_error(idx, e))
}

/// Reads a nullable RFC 3339 timestamp column.
pub(super) fn opt_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<Timestamp>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| s.parse::<Timestamp>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Reads a nullable ISO 8601 date column.
pub(super) fn opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<Date>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| s.parse::<Date>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Reads a text column holding one of the status/role enums.
pub(super) fn parsed<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

/// Reads an integer primary key as a canonical id.
pub(super) fn canonical_id(row: &Row, idx: usize, kind: IdKind) -> rusqlite::Result<RecordId> {
    Ok(RecordId::canonical(kind, row.get(idx)?))
}

/// Reads a JSON array column of strings.
pub(super) fn string_list(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// Resolves a canonical id to its row id.
pub(super) fn row_id(kind: IdKind, id: &RecordId) -> Result<i64> {
    id.row_id(kind)
        .ok_or_else(|| TrackerError::not_found(kind.name(), id))
}

pub(super) fn opt_string<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}
