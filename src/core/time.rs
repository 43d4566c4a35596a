// src/core/time.rs
//! Dates, date-times and the clocks the core relies on.
//!
//! Notion mixes bare dates (`2023-01-01`) and full timestamps in the same
//! fields, so [`DateOrDateTime`] keeps the distinction. Naive date-times
//! are interpreted in a process-wide default zone.

use super::serialization::{Deserializable, Serializable};
use crate::constants::DEFAULT_TIME_ZONE_OFFSET_SECS;
use crate::error::SerializationError;
use crate::types::ValidationError;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

static DEFAULT_TIME_ZONE: Lazy<RwLock<FixedOffset>> = Lazy::new(|| {
    RwLock::new(FixedOffset::east_opt(DEFAULT_TIME_ZONE_OFFSET_SECS).unwrap_or(utc_offset()))
});

static BARE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("bare date regex is valid"));

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// The zone naive date-times are attached to and parsed date-times are converted into.
pub fn default_time_zone() -> FixedOffset {
    *DEFAULT_TIME_ZONE.read()
}

pub fn set_default_time_zone(offset: FixedOffset) {
    *DEFAULT_TIME_ZONE.write() = offset;
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_offset(input: &str) -> Result<FixedOffset, ValidationError> {
    let invalid = || ValidationError::InvalidTimeZone(input.to_string());
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }

    let (sign, rest) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Strictly increasing microsecond clock used to order snapshots.
///
/// Two snapshots built in the same microsecond still get distinct,
/// ordered timestamps.
pub fn next_timestamp() -> i64 {
    let now = Utc::now().timestamp_micros();
    let previous = LAST_TIMESTAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}

/// Parses a date-time string into the default time zone.
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>, SerializationError> {
    let zone = default_time_zone();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&zone));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            if let Some(local) = zone.from_local_datetime(&naive).single() {
                return Ok(local);
            }
        }
    }
    Err(SerializationError::new("cannot parse date-time").with_var("text", text))
}

/// A calendar date, or a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOrDateTime {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl DateOrDateTime {
    /// The calendar date, in the value's own zone for date-times.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(datetime) => datetime.date_naive(),
        }
    }

    pub fn has_time(&self) -> bool {
        matches!(self, Self::DateTime(_))
    }
}

impl From<NaiveDate> for DateOrDateTime {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<DateTime<FixedOffset>> for DateOrDateTime {
    fn from(datetime: DateTime<FixedOffset>) -> Self {
        Self::DateTime(datetime)
    }
}

impl Serializable for DateOrDateTime {
    fn serialize(&self) -> Result<Value, SerializationError> {
        match self {
            Self::Date(date) => date.serialize(),
            Self::DateTime(datetime) => datetime.serialize(),
        }
    }
}

impl Deserializable for DateOrDateTime {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let text = expect_str(value, "date or date-time")?;
        if BARE_DATE.is_match(text) {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|e| {
                    SerializationError::new(format!("invalid date: {}", e)).with_value(value)
                })
        } else {
            parse_datetime(text).map(Self::DateTime)
        }
    }
}

impl Serializable for NaiveDate {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(self.format("%Y-%m-%d").to_string()))
    }
}

impl Deserializable for NaiveDate {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let text = expect_str(value, "date")?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| SerializationError::new(format!("invalid date: {}", e)).with_value(value))
    }
}

impl Serializable for NaiveDateTime {
    /// Naive date-times are attached to the default zone before formatting.
    fn serialize(&self) -> Result<Value, SerializationError> {
        let zone = default_time_zone();
        zone.from_local_datetime(self)
            .single()
            .ok_or_else(|| {
                SerializationError::new("date-time does not exist in the default time zone")
                    .with_var("datetime", self)
            })?
            .serialize()
    }
}

impl<Tz: TimeZone> Serializable for DateTime<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(
            self.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }
}

impl Deserializable for DateTime<FixedOffset> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let text = expect_str(value, "date-time")?;
        parse_datetime(text).map_err(|e| e.with_value(value))
    }
}

fn expect_str<'a>(value: &'a Value, expected: &str) -> Result<&'a str, SerializationError> {
    value.as_str().ok_or_else(|| {
        SerializationError::new(format!("expected a {} string", expected)).with_value(value)
    })
}
