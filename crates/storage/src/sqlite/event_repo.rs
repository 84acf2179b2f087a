use progress_core::model::{CourseProgressEvent, EventId, NewEvent};

use super::{
    SqliteRepository,
    mapping::{map_event_row, timestamp_to_parts, u64_from_i64},
};
use crate::repository::{EventRepository, StorageError};

fn write_error(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl EventRepository for SqliteRepository {
    async fn create(&self, event: NewEvent) -> Result<CourseProgressEvent, StorageError> {
        let stored = event.into_stored(EventId::generate());
        let (secs, nanos) = timestamp_to_parts(stored.timestamp());

        sqlx::query(
            r"
                INSERT INTO course_progress_events (
                    id, user_id, course_id, occurred_at_secs, occurred_at_nanos, event_type
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(stored.id().to_string())
        .bind(stored.user_id())
        .bind(stored.course_id())
        .bind(secs)
        .bind(nanos)
        .bind(stored.event_type().as_str())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(stored)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CourseProgressEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, course_id, occurred_at_secs, occurred_at_nanos, event_type
                FROM course_progress_events
                WHERE user_id = ?1
                ORDER BY occurred_at_secs ASC, occurred_at_nanos ASC, seq ASC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_event_row(&row)?);
        }
        Ok(out)
    }

    async fn find_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<CourseProgressEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, course_id, occurred_at_secs, occurred_at_nanos, event_type
                FROM course_progress_events
                WHERE course_id = ?1
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_event_row(&row)?);
        }
        Ok(out)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_progress_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        u64_from_i64("count", total)
    }

    async fn delete_all(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM course_progress_events")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.rows_affected())
    }
}
