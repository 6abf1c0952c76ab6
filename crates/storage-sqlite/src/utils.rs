//! Helpers shared by the repositories: SQLite parameter chunking and the
//! TEXT encodings used for decimals and timestamps.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::error;
use rust_decimal::Decimal;
use std::str::FromStr;
use stratfolio_core::constants::DECIMAL_PRECISION;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite limits the number of bound parameters per statement (typically 999),
/// so lists used in `IN (...)` clauses are split into chunks of this size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Chunk a slice into smaller slices for batch SQLite queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn decimal_to_text(value: Decimal) -> String {
    value.round_dp(DECIMAL_PRECISION).normalize().to_string()
}

/// Parses a stored decimal, logging and falling back to zero on corrupt data.
pub fn text_to_decimal(field: &str, value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        error!("Failed to parse DB decimal {} '{}': {}", field, value, e);
        Decimal::ZERO
    })
}

/// Fixed-width RFC 3339 (microseconds, `Z`), so text order is time order.
pub fn timestamp_to_text(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn text_to_timestamp(field: &str, value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            error!("Failed to parse DB timestamp {} '{}': {}", field, value, e);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

pub fn date_to_text(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn text_to_date(field: &str, value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, DATE_FORMAT).unwrap_or_else(|e| {
        error!("Failed to parse DB date {} '{}': {}", field, value, e);
        NaiveDate::default()
    })
}
