//! Human-readable duration parsing (e.g., "24h", "1500ms").

use std::time::Duration;

use thiserror::Error;

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{input}' - expected a number with ms, s, m, h or d suffix")]
pub struct DurationParseError {
    input: String,
}

const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
];

/// Parse a duration such as `24h`, `30m`, `90s` or `1500ms`.
///
/// A bare number is taken as seconds.
///
/// ```
/// use std::time::Duration;
/// use tilecache::config::parse_duration;
///
/// assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
/// assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let err = || DurationParseError {
        input: s.to_string(),
    };

    let lower = s.trim().to_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);
    let number: u64 = number.parse().map_err(|_| err())?;

    let millis_per = match unit.trim() {
        "" => 1_000,
        unit => UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, ms)| *ms)
            .ok_or_else(err)?,
    };

    number
        .checked_mul(millis_per)
        .map(Duration::from_millis)
        .ok_or_else(err)
}

/// Format a duration using the largest exact unit.
///
/// ```
/// use std::time::Duration;
/// use tilecache::config::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(86_400)), "1d");
/// assert_eq!(format_duration(Duration::from_secs(90)), "90s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis().min(u64::MAX as u128) as u64;
    if millis == 0 {
        return "0s".to_string();
    }

    UNITS
        .iter()
        .rev()
        .find(|(_, per)| millis % per == 0)
        .map(|(name, per)| format!("{}{}", millis / per, name))
        .unwrap_or_else(|| format!("{}ms", millis))
}
