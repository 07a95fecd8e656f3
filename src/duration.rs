// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Duration parsing for Go-style duration strings.
//!
//! The `pod-timeout` field of a `PrivateDNS` resource is written the way
//! Kubernetes operators usually write durations ("30s", "2m", "1h"). This
//! module parses those strings into `std::time::Duration`.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// Supported units:
/// - `s` (seconds): "30s"
/// - `m` (minutes): "2m"
/// - `h` (hours): "1h"
///
/// # Examples
///
/// ```
/// use privatedns::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
///
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err());  // Missing unit
/// assert!(parse_duration("10x").is_err()); // Invalid unit
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - The format is invalid (missing unit, non-numeric value)
/// - The duration is zero
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    // Find where digits end and unit begins
    let split_pos = duration_str
        .chars()
        .position(|c| !c.is_ascii_digit())
        .context("Duration must end with a unit (s, m, or h)")?;

    let (value_str, unit) = duration_str.split_at(split_pos);

    let value: u64 = value_str
        .parse()
        .context("Duration value must be a positive integer")?;

    let seconds = match unit {
        "s" => value,
        "m" => value
            .checked_mul(SECONDS_PER_MINUTE)
            .context("Duration value too large (overflow)")?,
        "h" => value
            .checked_mul(SECONDS_PER_HOUR)
            .context("Duration value too large (overflow)")?,
        _ => {
            bail!(
                "Unsupported duration unit '{unit}'. Use 's' (seconds), 'm' (minutes), or 'h' (hours)"
            )
        }
    };

    if seconds == 0 {
        bail!("Duration '{duration_str}' must be greater than zero");
    }

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
