use chrono::{DateTime, Utc};
use progress_core::model::{CourseProgressEvent, EventId, EventType};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Splits a timestamp into whole epoch seconds and subsecond nanos.
///
/// Covers the full `DateTime<Utc>` range, and `(secs, nanos)` order is time order.
pub(crate) fn timestamp_to_parts(at: DateTime<Utc>) -> (i64, i64) {
    (at.timestamp(), i64::from(at.timestamp_subsec_nanos()))
}

pub(crate) fn timestamp_from_parts(secs: i64, nanos: i64) -> Result<DateTime<Utc>, StorageError> {
    u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::from_timestamp(secs, n))
        .ok_or_else(|| StorageError::Serialization(format!("invalid occurred_at {secs}.{nanos}")))
}

pub(crate) fn parse_event_type(s: &str) -> Result<EventType, StorageError> {
    match s {
        "started" => Ok(EventType::Started),
        "passed" => Ok(EventType::Passed),
        "failed" => Ok(EventType::Failed),
        _ => Err(StorageError::Serialization(format!("invalid event type: {s}"))),
    }
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn map_event_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CourseProgressEvent, StorageError> {
    let id: EventId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let occurred_at = timestamp_from_parts(
        row.try_get("occurred_at_secs").map_err(ser)?,
        row.try_get("occurred_at_nanos").map_err(ser)?,
    )?;
    let event_type = parse_event_type(&row.try_get::<String, _>("event_type").map_err(ser)?)?;

    CourseProgressEvent::from_persisted(
        id,
        row.try_get("user_id").map_err(ser)?,
        row.try_get("course_id").map_err(ser)?,
        occurred_at,
        event_type,
    )
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use progress_core::time::fixed_now;

    #[test]
    fn timestamp_parts_sort_chronologically() {
        let base = fixed_now();
        let before = timestamp_to_parts(base - Duration::milliseconds(500));
        let whole = timestamp_to_parts(base);
        let fraction = timestamp_to_parts(base + Duration::milliseconds(500));
        assert_eq!(whole, (1_700_000_000, 0));
        assert_eq!(before, (1_699_999_999, 500_000_000));
        assert!(before < whole);
        assert!(whole < fraction);
    }

    #[test]
    fn timestamp_parts_round_trip_extremes() {
        let samples = [
            fixed_now() + Duration::nanoseconds(123_456_789),
            "+10000-01-01T00:00:00Z".parse().unwrap(),
            "-0001-01-01T00:00:00.000000001Z".parse().unwrap(),
            DateTime::<Utc>::MIN_UTC,
            DateTime::<Utc>::MAX_UTC,
        ];
        for at in samples {
            let (secs, nanos) = timestamp_to_parts(at);
            assert_eq!(timestamp_from_parts(secs, nanos).unwrap(), at);
        }
    }

    #[test]
    fn timestamp_parts_reject_garbage() {
        assert!(matches!(
            timestamp_from_parts(0, -1),
            Err(StorageError::Serialization(_))
        ));
        assert!(matches!(
            timestamp_from_parts(i64::MAX, 0),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn event_type_encoding_matches_core() {
        for kind in [EventType::Started, EventType::Passed, EventType::Failed] {
            assert_eq!(parse_event_type(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            parse_event_type("paused"),
            Err(StorageError::Serialization(_))
        ));
    }
}
