//! Storage queries for the scoring engine
//!
//! Functions here return raw `sqlx::Error`; callers attach lookup or
//! persistence context. Write helpers take a `&mut SqliteConnection` so they
//! run equally inside a transaction or on a pooled connection.

pub mod catalog;
pub mod heats;
pub mod import;
pub mod retry;
pub mod scores;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::error::decode_error;

/// Read a UUID stored as TEXT
pub(crate) fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let text: String = row.try_get(column)?;
    Uuid::parse_str(&text).map_err(|e| decode_error(column, e))
}

/// Read a nullable UUID stored as TEXT
pub(crate) fn optional_uuid_column(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| Uuid::parse_str(&t).map_err(|e| decode_error(column, e)))
        .transpose()
}

/// Read a nullable positive INTEGER as `u32`
pub(crate) fn optional_u32_column(row: &SqliteRow, column: &str) -> Result<Option<u32>, sqlx::Error> {
    let value: Option<i64> = row.try_get(column)?;
    value
        .map(|v| u32::try_from(v).map_err(|e| decode_error(column, e)))
        .transpose()
}

/// True when the error is a UNIQUE or PRIMARY KEY constraint failure
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
