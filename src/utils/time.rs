use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::utils::error::{AppError, AppResult};

const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

/// Timestamp as it crosses the API boundary: ISO-8601 text or epoch milliseconds.
///
/// Query strings always arrive as text, so digit-only strings are read as milliseconds too.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Millis(ms) => from_millis(ms),
            RawTimestamp::Text(text) => parse_timestamp(&text),
        };
        parsed.map(Timestamp).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

pub fn from_millis(ms: i64) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AppError::InvalidInput(format!("Timestamp out of range: {}", ms)))
}

pub fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ms) = value.parse::<i64>() {
        return from_millis(ms);
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidInput(format!("Invalid timestamp: '{}'", value)))
}

pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MS_PER_HOUR
}

/// Rounds half-up at the given number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}
