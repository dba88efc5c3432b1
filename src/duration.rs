// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for Go-style duration strings.
//!
//! Rotation frequencies, retention TTLs and operator flags are all written the
//! way Kubernetes writes `metav1.Duration` values: a sequence of
//! `<integer><unit>` segments such as `"90s"`, `"1h30m"` or `"720h"`.
//! Days and weeks are accepted as a convenience.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_DAY: u64 = 86400;
const SECONDS_PER_WEEK: u64 = 604_800;

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// Supported units:
/// - `ms` (milliseconds)
/// - `s` (seconds)
/// - `m` (minutes)
/// - `h` (hours)
/// - `d` (days)
/// - `w` (weeks)
///
/// Segments may be combined (`"1h30m"`). A bare `"0"` is accepted and means zero.
///
/// # Examples
///
/// ```
/// use cf_operator::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
///
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err());  // Missing unit
/// assert!(parse_duration("10x").is_err()); // Invalid unit
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, a segment has no unit, a unit is
/// unknown, or the total overflows.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let input = duration_str.trim();
    if input.is_empty() {
        bail!("Duration string cannot be empty");
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .with_context(|| format!("Duration '{input}' must end with a unit (s, m, h, d or w)"))?;
        if digits_end == 0 {
            bail!("Duration '{input}' has a unit without a value");
        }
        let (value_str, after_value) = rest.split_at(digits_end);
        let value: u64 = value_str
            .parse()
            .context("Duration value must be a positive integer")?;

        let unit_end = after_value
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(after_value.len());
        let (unit, remaining) = after_value.split_at(unit_end);

        let segment = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(checked(value, SECONDS_PER_MINUTE)?),
            "h" => Duration::from_secs(checked(value, SECONDS_PER_HOUR)?),
            "d" => Duration::from_secs(checked(value, SECONDS_PER_DAY)?),
            "w" => Duration::from_secs(checked(value, SECONDS_PER_WEEK)?),
            _ => bail!(
                "Unsupported duration unit '{unit}'. Use 'ms', 's', 'm', 'h', 'd' or 'w'"
            ),
        };

        total = total
            .checked_add(segment)
            .context("Duration value too large (overflow)")?;
        rest = remaining;
    }

    Ok(total)
}

fn checked(value: u64, factor: u64) -> Result<u64> {
    value
        .checked_mul(factor)
        .context("Duration value too large (overflow)")
}

/// Parse a duration into a `chrono::Duration` for timestamp arithmetic.
///
/// # Errors
///
/// Returns an error if the string is not a valid duration or is out of
/// `chrono`'s range.
pub fn parse_chrono_duration(duration_str: &str) -> Result<chrono::Duration> {
    let std_duration = parse_duration(duration_str)?;
    chrono::Duration::from_std(std_duration)
        .with_context(|| format!("Duration '{duration_str}' is out of range"))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
