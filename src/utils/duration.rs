//! Interval parsing for heartbeat cadence strings like "30m" or "1h".

use std::time::Duration;

use crate::error::{HeartwireError, Result};

/// Parse an interval string into a duration.
///
/// Accepted units are `ms`, `s`, `m`, `h` and `d`; a bare number is read as
/// minutes. Fractional values such as `1.5h` are allowed.
pub fn parse_interval(raw: &str) -> Result<Duration> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return Err(HeartwireError::Config("Interval is empty".to_string()));
    }

    let (number, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000.0)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000.0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000.0)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 86_400_000.0)
    } else {
        (s.as_str(), 60_000.0)
    };

    let value: f64 = number.trim().parse().map_err(|_| {
        HeartwireError::Config(format!(
            "Invalid interval '{}'. Use formats like 30m, 1h, or 90s",
            raw.trim()
        ))
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(HeartwireError::Config(format!(
            "Interval must be a non-negative number: '{}'",
            raw.trim()
        )));
    }

    Ok(Duration::from_millis((value * unit_ms).round() as u64))
}
