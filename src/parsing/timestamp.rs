//! Event timestamp parsing
//!
//! Timestamps are read with the dataset's own pattern first, then as
//! RFC 3339, then as integer epoch milliseconds. Naive date-times are UTC.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime};

/// Parse a lexical timestamp into milliseconds since epoch
pub fn parse_timestamp(lexical: &str, pattern: &str) -> Result<i64> {
    let value = lexical.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
        return Ok(naive.and_utc().timestamp_millis());
    }
    if let Ok(dated) = DateTime::parse_from_rfc3339(value) {
        return Ok(dated.timestamp_millis());
    }
    value.parse::<i64>().map_err(|_| {
        Error::MalformedEvent(format!(
            "timestamp {:?} matches neither {:?}, RFC 3339 nor epoch millis",
            lexical, pattern
        ))
    })
}
