//! Scalar conversions between structured text and FIX wire text.
//!
//! Structured side: `true`/`false`, plain integers and decimals, ISO-8601 dates and times.
//! Wire side: `Y`/`N`, `YYYYMMDD`, `HH:MM:SS[.fff]`, `YYYYMMDD-HH:MM:SS[.fff]`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use std::fmt;

use crate::schema::ScalarType;

const WIRE_DATE: &str = "%Y%m%d";
const WIRE_TIME: &str = "%H:%M:%S";
const WIRE_TIMESTAMP: &str = "%Y%m%d-%H:%M:%S";

/// Which conversion failed; rendered into the accumulated error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionError {
    Boolean,
    Integer,
    Decimal,
    DateOnly,
    TimeOnly,
    Timestamp,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversionError::Boolean => "boolean",
            ConversionError::Integer => "integer",
            ConversionError::Decimal => "decimal",
            ConversionError::DateOnly => "date-only",
            ConversionError::TimeOnly => "time-only",
            ConversionError::Timestamp => "date-time",
        })
    }
}

/// Sub-second precision written on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimePrecision {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl TimePrecision {
    /// Picks the precision from the nanosecond part: exact seconds, then by magnitude of
    /// the remainder (below 1µs → nanos, below 1ms → micros, otherwise millis).
    pub fn from_nanos(nanos: u32) -> Self {
        match nanos % 1_000_000_000 {
            0 => TimePrecision::Seconds,
            1..=999 => TimePrecision::Nanos,
            1_000..=999_999 => TimePrecision::Micros,
            _ => TimePrecision::Millis,
        }
    }

    fn fraction(self) -> &'static str {
        match self {
            TimePrecision::Seconds => "",
            TimePrecision::Millis => "%.3f",
            TimePrecision::Micros => "%.6f",
            TimePrecision::Nanos => "%.9f",
        }
    }
}

/// Structured text → wire text.
pub fn to_wire(scalar: ScalarType, value: &str) -> Result<String, ConversionError> {
    match scalar {
        ScalarType::Boolean => match value {
            "true" | "Y" => Ok("Y".into()),
            "false" | "N" => Ok("N".into()),
            _ => Err(ConversionError::Boolean),
        },
        ScalarType::Int => parse_int(value).ok_or(ConversionError::Integer),
        ScalarType::Decimal => parse_decimal(value).ok_or(ConversionError::Decimal),
        ScalarType::DateOnly => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(value, WIRE_DATE))
            .map(|date| date.format(WIRE_DATE).to_string())
            .map_err(|_| ConversionError::DateOnly),
        ScalarType::TimeOnly => parse_time(value)
            .map(|time| format_time(&time, WIRE_TIME, time.nanosecond()))
            .ok_or(ConversionError::TimeOnly),
        ScalarType::Timestamp => parse_timestamp(value)
            .map(|ts| format_time(&ts, WIRE_TIMESTAMP, ts.nanosecond()))
            .ok_or(ConversionError::Timestamp),
        ScalarType::Text => Ok(value.to_string()),
    }
}

/// Wire text → structured text.
pub fn from_wire(scalar: ScalarType, value: &str) -> Result<String, ConversionError> {
    match scalar {
        ScalarType::Boolean => match value {
            "Y" => Ok("true".into()),
            "N" => Ok("false".into()),
            _ => Err(ConversionError::Boolean),
        },
        ScalarType::Int => parse_int(value).ok_or(ConversionError::Integer),
        ScalarType::Decimal => parse_decimal(value).ok_or(ConversionError::Decimal),
        ScalarType::DateOnly => NaiveDate::parse_from_str(value, WIRE_DATE)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .map_err(|_| ConversionError::DateOnly),
        ScalarType::TimeOnly => NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
            .map(|time| format_iso(&time, "%H:%M:%S", time.nanosecond()))
            .map_err(|_| ConversionError::TimeOnly),
        ScalarType::Timestamp => NaiveDateTime::parse_from_str(value, "%Y%m%d-%H:%M:%S%.f")
            .map(|ts| format_iso(&ts, "%Y-%m-%dT%H:%M:%S", ts.nanosecond()))
            .map_err(|_| ConversionError::Timestamp),
        ScalarType::Text => Ok(value.to_string()),
    }
}

fn parse_int(value: &str) -> Option<String> {
    if value.starts_with('+') {
        return None;
    }
    value.parse::<i64>().ok().map(|n| n.to_string())
}

/// `-?digits[.digits]`, parsed without rounding.
fn parse_decimal(value: &str) -> Option<String> {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !fraction.map_or(true, digits) {
        return None;
    }
    Decimal::from_str_exact(value).ok().map(|d| d.to_string())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%d-%H:%M:%S%.f"))
        .ok()
}

fn format_time<T>(value: &T, pattern: &str, nanos: u32) -> String
where
    T: FormatWith,
{
    let pattern = format!("{}{}", pattern, TimePrecision::from_nanos(nanos).fraction());
    value.format_with(&pattern)
}

/// ISO text keeps every significant digit (3, 6 or 9 fraction digits).
fn format_iso<T>(value: &T, pattern: &str, nanos: u32) -> String
where
    T: FormatWith,
{
    let nanos = nanos % 1_000_000_000;
    let fraction = if nanos == 0 {
        ""
    } else if nanos % 1_000_000 == 0 {
        "%.3f"
    } else if nanos % 1_000 == 0 {
        "%.6f"
    } else {
        "%.9f"
    };
    value.format_with(&format!("{}{}", pattern, fraction))
}

trait FormatWith {
    fn format_with(&self, pattern: &str) -> String;
}

impl FormatWith for NaiveTime {
    fn format_with(&self, pattern: &str) -> String {
        self.format(pattern).to_string()
    }
}

impl FormatWith for NaiveDateTime {
    fn format_with(&self, pattern: &str) -> String {
        self.format(pattern).to_string()
    }
}
