//! Timestamp encoding for the store.
//!
//! Timestamps are stored as fixed-width UTC text with microsecond
//! precision, so lexicographic comparison in SQL matches chronological
//! order and the `since` watermark survives a round trip through clients.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn encode(ts: DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

pub fn decode(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| anyhow!("bad timestamp '{}': {}", raw, e))
}
