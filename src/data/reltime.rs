use chrono::{DateTime, Utc};

/// Marker shown when a timestamp cannot be interpreted.
pub const UNKNOWN_TIME: &str = "??";

const MINUTE_MS: f64 = 60.0 * 1000.0;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;
const YEAR_MS: f64 = 365.0 * DAY_MS;
const MONTH_MS: f64 = YEAR_MS / 12.0;

/// Units from largest to smallest; the first one the delta exceeds is used.
const UNITS: &[(&str, f64)] = &[
    ("y", YEAR_MS),
    ("mo", MONTH_MS),
    ("d", DAY_MS),
    ("h", HOUR_MS),
    ("m", MINUTE_MS),
];

/// Format `date` relative to `reference`, e.g. `"45m ago"`, `"1.5h ago"`,
/// `"in 2d"`. Values are rounded to two decimals; below one minute the delta
/// is given in whole seconds.
pub fn format_relative(date: DateTime<Utc>, reference: DateTime<Utc>) -> String {
    let delta_ms = (date - reference).num_milliseconds() as f64;

    for (unit, unit_ms) in UNITS {
        if delta_ms.abs() > *unit_ms {
            let value = (100.0 * delta_ms / unit_ms).round() / 100.0;
            return phrase(value, unit);
        }
    }

    phrase((delta_ms / 1000.0).round(), "s")
}

/// Format a raw RFC 3339 timestamp; missing or unparseable input gives
/// [`UNKNOWN_TIME`].
pub fn format_relative_str(raw: Option<&str>, reference: DateTime<Utc>) -> String {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|date| format_relative(date.with_timezone(&Utc), reference))
        .unwrap_or_else(|| UNKNOWN_TIME.to_string())
}

fn phrase(value: f64, unit: &str) -> String {
    if value > 0.0 {
        format!("in {}{}", format_amount(value), unit)
    } else {
        format!("{}{} ago", format_amount(value.abs()), unit)
    }
}

fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
