//! Cell normalization.
//!
//! Every explorer result is reduced to text so callers never see driver types.
//! Statements are sent unprepared, which makes MySQL and PostgreSQL answer in
//! their text protocol; SQLite converts stored values to text on request.
//!
//! Per cell:
//! 1. SQL NULL becomes [`NULL_CELL`]
//! 2. Binary columns are decoded as UTF-8, or base64 when not valid UTF-8
//! 3. Everything else is read as text, falling back to the byte path

use crate::models::TabularResult;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, TypeInfo, ValueRef};
use tracing::warn;

/// Rendering of SQL NULL.
pub const NULL_CELL: &str = "NULL";

/// Check whether a driver type name carries raw bytes.
pub fn is_binary_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    lower.contains("blob") || lower.contains("binary") || lower == "bytea"
}

/// Render bytes as UTF-8 text, or base64 when they are not valid UTF-8.
pub fn decode_binary_value(bytes: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

/// Trait for converting database rows to text cells.
pub trait RowToStrings {
    fn column_names(&self) -> Vec<String>;
    /// One cell per column, in column order.
    fn to_strings(&self) -> Result<Vec<String>, sqlx::Error>;
}

impl RowToStrings for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_strings(&self) -> Result<Vec<String>, sqlx::Error> {
        row_to_strings(self)
    }
}

impl RowToStrings for PgRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_strings(&self) -> Result<Vec<String>, sqlx::Error> {
        row_to_strings(self)
    }
}

impl RowToStrings for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_strings(&self) -> Result<Vec<String>, sqlx::Error> {
        row_to_strings(self)
    }
}

fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn row_to_strings<R>(row: &R) -> Result<Vec<String>, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_cell(row, idx, col.type_info().name()))
        .collect()
}

fn decode_cell<R>(row: &R, idx: usize, type_name: &str) -> Result<String, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    if row.try_get_raw(idx)?.is_null() {
        return Ok(NULL_CELL.to_string());
    }

    if is_binary_type(type_name) {
        let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
        return Ok(decode_binary_value(&bytes));
    }

    match row.try_get_unchecked::<String, _>(idx) {
        Ok(text) => Ok(text),
        Err(text_err) => match row.try_get_unchecked::<Vec<u8>, _>(idx) {
            Ok(bytes) => Ok(decode_binary_value(&bytes)),
            Err(_) => Err(text_err),
        },
    }
}

/// Normalize fetched rows. Rows that fail to decode are logged and skipped.
pub fn rows_to_tabular<R: RowToStrings>(
    columns: Vec<String>,
    rows: &[R],
    context: &str,
) -> TabularResult {
    let mut result = TabularResult::new(columns);
    for (idx, row) in rows.iter().enumerate() {
        match row.to_strings() {
            Ok(cells) => {
                if !result.push_row(cells) {
                    warn!(context, row = idx, "Skipping row with unexpected column count");
                }
            }
            Err(e) => {
                warn!(context, row = idx, error = %e, "Skipping row that could not be decoded");
            }
        }
    }
    result
}
