//! CLI command implementations.

pub mod dump;
pub mod history;
pub mod kv;
pub mod serve;
pub mod shell;

use stagekv_core::{Config, StagingEngine, Value};
use std::path::Path;

/// Opens the store directory, creating it if needed.
pub fn open_engine(path: &Path) -> Result<StagingEngine, Box<dyn std::error::Error>> {
    Ok(StagingEngine::open(path, Config::default())?)
}

/// Parses command-line value text.
///
/// Valid JSON is stored as-is; any other text is stored as a JSON string,
/// so `put name Ava` and `put name '"Ava"'` are equivalent.
pub fn parse_value(text: &str) -> Value {
    Value::parse(text).unwrap_or_else(|_| Value::from(text))
}

/// Formats a Unix timestamp in milliseconds as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(ms: u64) -> String {
    let secs = ms / 1000;
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Converts days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
