use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StorageError;

/// Fixed-width RFC 3339 so that lexical order in SQLite equals time order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StorageError::Corrupt(format!("failed to parse {field} '{value}': {err}")))
}

pub fn to_i64(value: usize) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("value {value} exceeds SQLite INTEGER range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_at_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-03-09T07:05:01.000Z");
        assert_eq!(parse_datetime(&text, "timestamp").unwrap(), ts);
    }

    #[test]
    fn garbage_timestamp_is_corrupt() {
        let err = parse_datetime("yesterday", "timestamp").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
