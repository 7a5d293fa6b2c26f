//! Timestamp parsing for `until` filters.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use corral_common::error::{CorralError, Result};

/// Parses a filter timestamp relative to `now`.
///
/// Accepts a duration (`90s`, `1h30m`, subtracted from `now`), Unix
/// seconds with an optional fraction, RFC 3339, `YYYY-MM-DDTHH:MM:SS`,
/// and `YYYY-MM-DD` (the latter two in UTC).
///
/// # Errors
///
/// Returns [`CorralError::InvalidArgument`] if no format matches, or if
/// a duration reaches past the representable range.
pub fn parse_timestamp(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Some(ago) = parse_duration(value)? {
        return now
            .checked_sub_signed(ago)
            .ok_or_else(|| out_of_range(value));
    }
    if let Some(ts) = parse_unix(value) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(CorralError::invalid_argument(format!(
        "failed to parse timestamp {value:?}"
    )))
}

fn out_of_range(value: &str) -> CorralError {
    CorralError::invalid_argument(format!("duration {value:?} is out of range"))
}

/// Parses a duration such as `300ms`, `1.5h`, or `2h45m`.
///
/// `Ok(None)` means the value is not a duration at all.
fn parse_duration(value: &str) -> Result<Option<Duration>> {
    if value.is_empty() || value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Ok(None);
    }
    let mut total = Duration::zero();
    let mut rest = value;
    while !rest.is_empty() {
        let Some(split) = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter(|&i| i > 0)
        else {
            return Ok(None);
        };
        let (number, tail) = rest.split_at(split);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Ok(None),
        };
        let Ok(amount) = number.parse::<f64>() else {
            return Ok(None);
        };
        let nanos = amount * nanos_per_unit;
        #[allow(clippy::cast_precision_loss)]
        let limit = i64::MAX as f64;
        if !nanos.is_finite() || nanos >= limit {
            return Err(out_of_range(value));
        }
        #[allow(clippy::cast_possible_truncation)]
        let component = Duration::nanoseconds(nanos as i64);
        total = total
            .checked_add(&component)
            .ok_or_else(|| out_of_range(value))?;
        rest = next;
    }
    Ok(Some(total))
}

fn parse_unix(value: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = value.split_once('.').unwrap_or((value, ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) || frac.len() > 9 {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    let nanos: u32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().ok()?
    };
    Utc.timestamp_opt(secs, nanos).single()
}
