//! # Timestamps
//!
//! RFC 3339 UTC instants with microsecond precision.
//!
//! The wire form is always `YYYY-MM-DDTHH:MM:SS.ffffffZ`. Instants are
//! truncated to whole microseconds when constructed, so formatting and
//! parsing a [`Timestamp`] is lossless.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error from parsing a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid RFC 3339 timestamp '{value}'")]
pub struct TimestampError {
    pub value: String,
}

/// A UTC instant with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap a chrono instant, truncating to microseconds.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt))
    }

    /// Build from microseconds since the Unix epoch.
    #[must_use]
    pub fn from_unix_micros(micros: i64) -> Option<Self> {
        DateTime::from_timestamp_micros(micros).map(Self)
    }

    /// Microseconds since the Unix epoch.
    #[must_use]
    pub fn unix_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Parse any RFC 3339 timestamp, normalising it to UTC.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|_| TimestampError {
                value: value.to_string(),
            })
    }

    /// Whether `value` is exactly in the canonical wire form.
    #[must_use]
    pub fn is_canonical(value: &str) -> bool {
        Self::parse(value).is_ok_and(|ts| ts.to_string() == value)
    }

    /// This instant shifted by whole days.
    #[must_use]
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// This instant shifted by whole hours.
    #[must_use]
    pub fn plus_hours(&self, hours: i64) -> Self {
        Self(self.0 + Duration::hours(hours))
    }

    /// This instant shifted by whole seconds.
    #[must_use]
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
