use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse interval strings like "30s", "500ms", "1.5m", "2h".
///
/// A bare number is taken as seconds, matching how the backend reports its
/// own refresh interval.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Ok(secs) = s.parse::<f64>() {
        return from_millis(secs * 1_000.0, s);
    }

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            if let Ok(val) = val_str.trim().parse::<f64>() {
                return from_millis(val * multiplier, s);
            }
        }
    }

    bail!("Unknown interval format: {}", s)
}

fn from_millis(millis: f64, raw: &str) -> Result<Duration> {
    if !millis.is_finite() || millis < 0.0 {
        bail!("Interval must be a positive number: {}", raw);
    }
    Ok(Duration::from_micros((millis * 1_000.0) as u64))
}

/// Format an interval for the status bar
pub fn format_interval(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{:.0}s", d.as_secs_f64())
    }
}
