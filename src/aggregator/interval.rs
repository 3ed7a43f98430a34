use std::time::Duration;

use crate::app::{GatorError, Result};

/// Parses a human-readable interval such as "30s", "1m" or "1h30m".
pub fn parse_interval(s: &str) -> Result<Duration> {
    let interval = humantime::parse_duration(s.trim())
        .map_err(|e| GatorError::InvalidInterval(format!("{s}: {e}")))?;

    if interval.is_zero() {
        return Err(GatorError::InvalidInterval(format!(
            "{s}: interval must be greater than zero"
        )));
    }

    Ok(interval)
}

pub fn format_interval(interval: Duration) -> String {
    humantime::format_duration(interval).to_string()
}
