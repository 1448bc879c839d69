//! Shared duration parsing (spec §15: one helper for the three call sites
//! that need "5m"/"30s"-style durations — settings, cleanup, `script`
//! assertions).

use std::time::Duration;

/// Parse a human-readable duration string (`"5m"`, `"30s"`, `"1h30m"`).
pub fn parse_duration(text: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(text.trim())
}

pub const DEFAULT_CASE_TIMEOUT: Duration = Duration::from_secs(300);
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

/// `script` assertions run under `max(case_timeout, 30s)` (spec §5).
pub fn script_assertion_timeout(case_timeout: Duration) -> Duration {
    case_timeout.max(CLEANUP_TIMEOUT)
}
