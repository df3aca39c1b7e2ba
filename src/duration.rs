use std::time::Duration;

use anyhow::{bail, Result};
use chrono::TimeDelta;

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse duration strings like "30s", "1.5m", "250ms" or "2h".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            return from_value(val_str, *multiplier, s);
        }
    }

    from_value(s, 1_000_000_000.0, s)
}

fn from_value(val_str: &str, multiplier: f64, original: &str) -> Result<Duration> {
    let val: f64 = match val_str.trim().parse() {
        Ok(val) => val,
        Err(_) => bail!("Unknown duration format: {}", original),
    };
    if !val.is_finite() || val < 0.0 {
        bail!("Duration must be a non-negative number: {}", original);
    }
    Ok(Duration::from_nanos((val * multiplier) as u64))
}

/// Format the time since a station was last seen, e.g. "12s", "3m 05s", "2h 04m".
pub fn format_age(age: Option<TimeDelta>) -> String {
    let Some(age) = age else {
        return "never".to_string();
    };

    let secs = age.num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {:02}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        let d = parse_duration("29.5s").unwrap();
        assert!((d.as_secs_f64() - 29.5).abs() < 0.0001);
    }

    #[test]
    fn test_parse_milliseconds() {
        let d = parse_duration("250ms").unwrap();
        assert_eq!(d, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_microseconds() {
        let d = parse_duration("16.958µs").unwrap();
        assert_eq!(d.as_nanos(), 16958);
    }

    #[test]
    fn test_parse_minutes_and_hours() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn test_bare_number_is_seconds() {
        assert_eq!(parse_duration(" 45 ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-3s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(None), "never");
        assert_eq!(format_age(Some(TimeDelta::seconds(12))), "12s");
        assert_eq!(format_age(Some(TimeDelta::seconds(185))), "3m 05s");
        assert_eq!(format_age(Some(TimeDelta::seconds(7440))), "2h 04m");
        assert_eq!(format_age(Some(TimeDelta::seconds(90_000))), "1d 01h");
        assert_eq!(format_age(Some(TimeDelta::seconds(-4))), "0s");
    }
}
