//! Timestamp parsing and rendering shared by the analytics and sync paths.
//!
//! Readings carry local wall-clock time (`NaiveDateTime`). The firmware stamps
//! local time but labels it `+00:00`, so by default an explicit offset is
//! ignored and the wall-clock digits are taken as written. Converting to an
//! absolute instant always goes through the configured local offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Timelike, Utc};
use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    Empty,
    Unrecognised(String),
}

impl Display for TimestampError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Empty => write!(f, "timestamp is empty"),
            TimestampError::Unrecognised(s) => write!(f, "unrecognised timestamp format: {:?}", s),
        }
    }
}

impl Error for TimestampError {}

/// How raw timestamp text maps onto local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampPolicy {
    pub local_offset: FixedOffset,
    /// Convert offset-bearing timestamps into `local_offset` instead of
    /// keeping their wall-clock digits.
    pub honor_offset: bool,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        TimestampPolicy {
            local_offset: Utc.fix(),
            honor_offset: false,
        }
    }
}

impl TimestampPolicy {
    pub fn parse(&self, raw: &str) -> Result<NaiveDateTime, TimestampError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(TimestampError::Empty);
        }

        if let Some(dt) = parse_with_offset(s) {
            return Ok(if self.honor_offset {
                dt.with_timezone(&self.local_offset).naive_local()
            } else {
                dt.naive_local()
            });
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .ok_or_else(|| TimestampError::Unrecognised(s.to_string()))
    }

    /// Unix seconds of a local wall-clock time.
    pub fn unix_seconds(&self, local: NaiveDateTime) -> i64 {
        local.and_utc().timestamp() - i64::from(self.local_offset.local_minus_utc())
    }

    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let secs = self.unix_seconds(local);
        DateTime::<Utc>::from_timestamp(secs, local.nanosecond()).unwrap_or_else(|| local.and_utc())
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.local_offset).naive_local()
    }
}

fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

/// ISO-8601 text without offset; microseconds only when non-zero.
pub fn format_iso(ts: NaiveDateTime) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Human-readable form used in CSV cells.
pub fn format_cell(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse `+05:30`, `-0300`, `Z` or `UTC` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match s.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(format!("UTC offset must start with '+' or '-': {}", s)),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("UTC offset must look like +HH:MM: {}", s));
    }
    let hours: i32 = digits[..2].parse().map_err(|_| format!("bad offset hours: {}", s))?;
    let minutes: i32 = digits[2..].parse().map_err(|_| format!("bad offset minutes: {}", s))?;
    if minutes >= 60 {
        return Err(format!("offset minutes out of range: {}", s));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| format!("offset out of range: {}", s))
}
