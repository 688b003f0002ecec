use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimestampMs(pub i64);

pub trait Clock: Send + Sync {
    fn now(&self) -> TimestampMs;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(Utc::now().timestamp_millis())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid timestamp {value:?}: expected RFC 3339")]
pub struct TimestampParseError {
    pub value: String,
}

impl TimestampMs {
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimestampParseError> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|parsed| TimestampMs(parsed.timestamp_millis()))
            .map_err(|_| TimestampParseError {
                value: value.to_string(),
            })
    }

    /// Fixed-width UTC rendering; lexical order of the output matches
    /// chronological order, which the storage layer relies on.
    pub fn to_iso8601(self) -> String {
        let datetime = DateTime::<Utc>::from_timestamp_millis(self.0)
            .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
        datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn hours_until(self, later: TimestampMs) -> f64 {
        (later.0 - self.0).max(0) as f64 / 3_600_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::TimestampMs;

    #[test]
    fn normalizes_offsets_to_utc_millis() {
        let parsed = TimestampMs::parse_rfc3339("2026-03-01T10:00:00+01:00").expect("valid");
        assert_eq!(parsed.to_iso8601(), "2026-03-01T09:00:00.000Z");
    }

    #[test]
    fn rejects_naive_timestamps() {
        let err = TimestampMs::parse_rfc3339("2026-03-01T10:00:00").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid timestamp \"2026-03-01T10:00:00\": expected RFC 3339"
        );
    }

    #[test]
    fn computes_elapsed_hours() {
        let start = TimestampMs(1_700_000_000_000);
        let end = TimestampMs(1_700_000_000_000 + 90 * 60 * 1000);
        assert!((start.hours_until(end) - 1.5).abs() < 1e-9);
        assert_eq!(end.hours_until(start), 0.0);
    }
}
