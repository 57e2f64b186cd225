//! Xero date literal normalization
//!
//! Xero emits two kinds of timestamps: legacy .NET JSON dates such as
//! `/Date(1419937200000+0000)/`, and ISO-8601 strings that may lack a zone.
//! Both are rewritten to RFC 3339 UTC strings so bookmarks compare cleanly.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DOTNET_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Date\((-?\d+)([-+])?(\d+)?\)").expect("static regex is valid")
});

static ISO_8601_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-([0-2]\d)-0?([0-3]\d)T([0-5]\d):([0-5]\d):([0-6]\d)")
        .expect("static regex is valid")
});

static ISO_8601_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<dt>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?)(?P<tz>Z|z|(?P<sign>[+-])(?P<hh>\d{1,2})(?::?(?P<mm>\d{2}))?)?$",
    )
    .expect("static regex is valid")
});

/// Parse a Xero date literal into a UTC instant.
///
/// Returns `None` when the string is not a date or cannot be parsed.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = DOTNET_DATE.captures(value) {
        return parse_dotnet(&caps);
    }

    if ISO_8601_PREFIX.is_match(value) {
        return parse_iso8601(value.trim());
    }

    None
}

/// Format an instant the way every emitted timestamp is formatted
pub fn format_date(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Normalize a single string; unmatched strings are returned unchanged
pub fn normalize_date_string(value: &str) -> Option<String> {
    parse_date(value).map(|instant| format_date(&instant))
}

/// Rewrite every date-valued string, recursively, in place
pub fn normalize_dates(value: &mut Value) {
    match value {
        Value::String(s) => {
            if let Some(normalized) = normalize_date_string(s) {
                *s = normalized;
            }
        }
        Value::Object(map) => map.values_mut().for_each(normalize_dates),
        Value::Array(items) => items.iter_mut().for_each(normalize_dates),
        _ => {}
    }
}

fn parse_dotnet(caps: &regex::Captures<'_>) -> Option<DateTime<Utc>> {
    let millis: i64 = caps.get(1)?.as_str().parse().ok()?;
    let base = DateTime::<Utc>::from_timestamp_millis(millis)?;

    let Some(offset) = caps.get(3).map(|m| m.as_str()) else {
        return Some(base);
    };

    // The offset is applied to the instant as-is: "+0100" moves it forward.
    let sign = match caps.get(2).map(|m| m.as_str()) {
        Some("-") => -1,
        _ => 1,
    };
    let (hours, minutes) = if offset.len() > 2 {
        (&offset[..2], &offset[2..])
    } else {
        (offset, "")
    };
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = if minutes.is_empty() {
        0
    } else {
        minutes.parse().ok()?
    };

    // Free text can match the pattern; out-of-range offsets leave it untouched.
    let offset = Duration::try_hours(sign * hours)?
        .checked_add(&Duration::try_minutes(sign * minutes)?)?;
    base.checked_add_signed(offset)
}

fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let caps = ISO_8601_FULL.captures(value)?;
    let naive = NaiveDateTime::parse_from_str(&caps["dt"], "%Y-%m-%dT%H:%M:%S%.f").ok()?;

    let offset = match caps.name("sign") {
        Some(sign) => {
            let hours: i64 = caps["hh"].parse().ok()?;
            let minutes: i64 = match caps.name("mm") {
                Some(mm) => mm.as_str().parse().ok()?,
                None => 0,
            };
            let total =
                Duration::try_hours(hours)?.checked_add(&Duration::try_minutes(minutes)?)?;
            if sign.as_str() == "-" {
                -total
            } else {
                total
            }
        }
        None => Duration::zero(),
    };

    naive.and_utc().checked_sub_signed(offset)
}
