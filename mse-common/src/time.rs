//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage (RFC 3339, millisecond precision, `Z` suffix)
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a timestamp written by [`to_storage`]
///
/// Accepts any RFC 3339 offset and normalizes it to UTC.
pub fn from_storage(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_storage_roundtrip_keeps_millis() {
        let ts = from_storage("2024-05-01T10:15:30.123Z").unwrap();
        assert_eq!(to_storage(&ts), "2024-05-01T10:15:30.123Z");
    }

    #[test]
    fn test_from_storage_normalizes_offset() {
        let ts = from_storage("2024-05-01T07:15:30.000-03:00").unwrap();
        assert_eq!(to_storage(&ts), "2024-05-01T10:15:30.000Z");
    }

    #[test]
    fn test_from_storage_rejects_garbage() {
        assert!(from_storage("yesterday").is_none());
    }
}
