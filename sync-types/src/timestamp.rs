//! UTC timestamps with a fixed, sortable text form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A point in time, UTC, with millisecond precision.
///
/// Rendered as RFC 3339 with exactly three fractional digits and a `Z`
/// suffix, e.g. `2024-05-01T12:30:00.250Z`. The fixed width makes the
/// lexicographic order of the text equal to chronological order, which the
/// SQLite backend relies on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock time, truncated to milliseconds.
    pub fn now() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self::from_unix_millis(millis).unwrap_or(Self(DateTime::<Utc>::default()))
    }

    /// Build a timestamp from milliseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside the representable range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying chrono value.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl FromStr for Timestamp {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|_| TypesError::InvalidTimestamp(s.to_string()))?;
        Self::from_unix_millis(parsed.timestamp_millis())
            .ok_or_else(|| TypesError::InvalidTimestamp(s.to_string()))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_fixed_width_utc() {
        let ts = Timestamp::from_unix_millis(1_714_566_600_250).unwrap();
        assert_eq!(ts.to_string(), "2024-05-01T12:30:00.250Z");

        let whole_second = Timestamp::from_unix_millis(1_714_566_600_000).unwrap();
        assert_eq!(whole_second.to_string(), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn parses_offsets_into_utc() {
        let ts: Timestamp = "2024-05-01T14:30:00.250+02:00".parse().unwrap();
        assert_eq!(ts.to_string(), "2024-05-01T12:30:00.250Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!("yesterday".parse::<Timestamp>().is_err());
        assert!("".parse::<Timestamp>().is_err());
    }

    #[test]
    fn text_order_matches_time_order() {
        let earlier = Timestamp::from_unix_millis(1_000).unwrap();
        let later = Timestamp::from_unix_millis(999_999_999_999).unwrap();
        assert!(earlier < later);
        assert!(earlier.to_string() < later.to_string());
    }

    #[test]
    fn now_has_millisecond_precision() {
        let ts = Timestamp::now();
        let reparsed: Timestamp = ts.to_string().parse().unwrap();
        assert_eq!(ts, reparsed);
    }

    #[test]
    fn serializes_as_string() {
        let ts = Timestamp::from_unix_millis(0).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:00.000Z\"");
    }
}
