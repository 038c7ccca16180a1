//! ---
//! poolio_section: "01-core-functionality"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Shared primitives and utilities for Poolio nodes."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

/// Wall-clock source used when a caller does not supply a timestamp.
pub trait Clock: Send + Sync {
    /// Current instant, carrying the offset it should be rendered with.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the host clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 instant, e.g. `2026-01-20T14:30:00-08:00`.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Format an instant as ISO-8601 with an explicit offset at second precision.
pub fn iso8601_seconds(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Seconds since the Unix epoch according to `clock`.
pub fn unix_seconds(clock: &dyn Clock) -> i64 {
    clock.now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_explicit_offset_and_whole_seconds() {
        let clock = FixedClock::parse("2026-01-20T14:30:00.750-08:00").expect("parse");
        assert_eq!(iso8601_seconds(&clock.now()), "2026-01-20T14:30:00-08:00");
    }

    #[test]
    fn utc_renders_as_numeric_offset() {
        let clock = FixedClock::parse("2026-01-20T22:30:00Z").expect("parse");
        assert_eq!(iso8601_seconds(&clock.now()), "2026-01-20T22:30:00+00:00");
    }

    #[test]
    fn unix_seconds_ignores_offset() {
        let pacific = FixedClock::parse("2026-01-20T14:30:00-08:00").expect("parse");
        let utc = FixedClock::parse("2026-01-20T22:30:00Z").expect("parse");
        assert_eq!(unix_seconds(&pacific), unix_seconds(&utc));
    }

    #[test]
    fn system_clock_output_round_trips() {
        let rendered = iso8601_seconds(&SystemClock.now());
        assert!(DateTime::parse_from_rfc3339(&rendered).is_ok());
        assert!(!rendered.contains('.'));
    }
}
