use async_trait::async_trait;
use progress_core::model::{CourseProgressEvent, EventId, NewEvent};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append-only store of course progress events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Assign an id to the event and persist it.
    ///
    /// Every call creates a new record, even for identical events.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn create(&self, event: NewEvent) -> Result<CourseProgressEvent, StorageError>;

    /// All events for a user, ascending by timestamp.
    ///
    /// Events with equal timestamps come back in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CourseProgressEvent>, StorageError>;

    /// All events for a course, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn find_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<CourseProgressEvent>, StorageError>;

    /// Total number of stored events.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Remove every event. Administrative and test use only.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete_all(&self) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    events: Arc<Mutex<Vec<CourseProgressEvent>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn matching<F>(&self, pred: F) -> Result<Vec<CourseProgressEvent>, StorageError>
    where
        F: Fn(&CourseProgressEvent) -> bool,
    {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().filter(|e| pred(e)).cloned().collect())
    }
}

#[async_trait]
impl EventRepository for InMemoryRepository {
    async fn create(&self, event: NewEvent) -> Result<CourseProgressEvent, StorageError> {
        let stored = event.into_stored(EventId::generate());
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CourseProgressEvent>, StorageError> {
        let mut found = self.matching(|e| e.user_id() == user_id)?;
        // stable sort keeps insertion order for equal timestamps
        found.sort_by_key(CourseProgressEvent::timestamp);
        Ok(found)
    }

    async fn find_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<CourseProgressEvent>, StorageError> {
        self.matching(|e| e.course_id() == course_id)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        u64::try_from(guard.len()).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn delete_all(&self) -> Result<u64, StorageError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = guard.len();
        guard.clear();
        u64::try_from(removed).map_err(|_| StorageError::Serialization("count overflow".into()))
    }
}

/// Bundles the event repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub events: Arc<dyn EventRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let events: Arc<dyn EventRepository> = Arc::new(InMemoryRepository::new());
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use progress_core::model::{EventDraft, EventType};
    use progress_core::time::fixed_now;

    fn new_event(user: &str, course: &str, minutes: i64, kind: EventType) -> NewEvent {
        EventDraft::new(user, course, fixed_now() + Duration::minutes(minutes), kind)
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids_for_identical_events() {
        let repo = InMemoryRepository::new();
        let a = repo
            .create(new_event("u1", "c1", 0, EventType::Started))
            .await
            .unwrap();
        let b = repo
            .create(new_event("u1", "c1", 0, EventType::Started))
            .await
            .unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.to_new_event(), b.to_new_event());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_by_user_sorts_by_timestamp_then_insertion() {
        let repo = InMemoryRepository::new();
        let late = repo
            .create(new_event("u1", "c1", 10, EventType::Passed))
            .await
            .unwrap();
        let tie_first = repo
            .create(new_event("u1", "c2", 5, EventType::Started))
            .await
            .unwrap();
        let tie_second = repo
            .create(new_event("u1", "c1", 5, EventType::Started))
            .await
            .unwrap();
        repo.create(new_event("u2", "c1", 0, EventType::Started))
            .await
            .unwrap();

        let history = repo.find_by_user("u1").await.unwrap();
        let ids: Vec<_> = history.iter().map(CourseProgressEvent::id).collect();
        assert_eq!(ids, vec![tie_first.id(), tie_second.id(), late.id()]);
    }

    #[tokio::test]
    async fn find_by_course_filters_and_delete_all_clears() {
        let repo = InMemoryRepository::new();
        repo.create(new_event("u1", "c1", 0, EventType::Started))
            .await
            .unwrap();
        repo.create(new_event("u2", "c2", 0, EventType::Started))
            .await
            .unwrap();

        let course = repo.find_by_course("c1").await.unwrap();
        assert_eq!(course.len(), 1);
        assert_eq!(course[0].user_id(), "u1");
        assert!(repo.find_by_user("nobody").await.unwrap().is_empty());

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[test]
    fn storage_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Storage>();
    }
}
