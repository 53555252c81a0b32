// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! Timestamps and durations as snapd writes them.
//!
//! snapd is written in Go: times are RFC 3339 with up to nine fractional
//! digits, durations use `time.Duration` string syntax (`1h2m3.5s`).

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{Error, Result};

/// Parse an RFC 3339 timestamp. An empty string is `None`.
pub fn parse_timestamp(value: &str) -> Result<Option<OffsetDateTime>> {
    if value.is_empty() {
        return Ok(None);
    }
    OffsetDateTime::parse(value, &Rfc3339)
        .map(Some)
        .map_err(|e| Error::bad_response(format!("invalid timestamp {value:?}: {e}")))
}

pub(crate) fn deserialize_optional<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        Some(value) => parse_timestamp(&value).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub(crate) fn deserialize_optional_duration<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => parse_go_duration(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A point in time for the notices `after` filter.
///
/// `time` is treated as carrying microsecond precision. `nanoseconds`, when
/// set, replaces the sub-second part on the wire:
///
/// - `None` writes the microseconds of `time` (six digits) when non-zero, and
///   no fraction otherwise.
/// - `Some(0)` writes no fraction at all, even if `time` has microseconds.
/// - `Some(n)` writes `n` as nine digits.
///
/// The `Some(0)` case is deliberately not normalised to `None`; the daemon
/// accepts both spellings and existing callers rely on the exact output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeTimestamp {
    pub time: OffsetDateTime,
    pub nanoseconds: Option<u32>,
}

impl NoticeTimestamp {
    pub fn new(time: OffsetDateTime) -> Self {
        Self {
            time,
            nanoseconds: None,
        }
    }

    pub fn with_nanoseconds(time: OffsetDateTime, nanoseconds: u32) -> Self {
        Self {
            time,
            nanoseconds: Some(nanoseconds),
        }
    }

    pub fn format(&self) -> String {
        let t = self.time;
        let mut out = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            t.year(),
            u8::from(t.month()),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        );
        match self.nanoseconds {
            Some(0) => {}
            Some(nanoseconds) => out.push_str(&format!(".{nanoseconds:09}")),
            None => {
                let micros = t.microsecond();
                if micros != 0 {
                    out.push_str(&format!(".{micros:06}"));
                }
            }
        }
        out.push_str(&format_offset(t.offset()));
        out
    }
}

fn format_offset(offset: UtcOffset) -> String {
    if offset.is_utc() {
        return "Z".to_string();
    }
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{sign}{:02}:{:02}", hours.unsigned_abs(), minutes.unsigned_abs())
}

/// Parse Go `time.Duration` syntax such as `1h0m0s`, `1.5s` or `300ms`.
pub fn parse_go_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::bad_response(format!("invalid duration: {value:?}"));
    let rest = value.strip_prefix('+').unwrap_or(value);
    if rest.starts_with('-') {
        return Err(Error::bad_response(format!("negative duration: {value:?}")));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let number_end = remaining
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = remaining.split_at(number_end);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(invalid()),
        };
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        total = whole
            .checked_mul(unit_nanos)
            .and_then(|nanos| total.checked_add(nanos))
            .ok_or_else(invalid)?;
        if !fraction.is_empty() {
            // nine digits are enough for nanosecond resolution of any unit up to hours
            let digits = &fraction[..fraction.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| invalid())?;
            let denominator = 10u128.pow(digits.len() as u32);
            total = total
                .checked_add(numerator * unit_nanos / denominator)
                .ok_or_else(invalid)?;
        }
        remaining = tail;
    }
    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

/// Format a duration so Go's `time.ParseDuration` reads it back exactly.
pub fn format_go_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else if duration.subsec_nanos() % 1_000 == 0 {
        format!("{}us", duration.as_micros())
    } else {
        format!("{}ns", duration.as_nanos())
    }
}
