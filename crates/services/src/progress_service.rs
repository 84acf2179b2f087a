use std::sync::Arc;

use progress_core::CourseStats;
use progress_core::model::{CourseProgressEvent, EventDraft, EventValidationError, NewEvent};
use storage::repository::EventRepository;
use tracing::{debug, error, info, warn};

use crate::error::ProgressServiceError;

/// Records progress events and answers history and course-analysis queries.
///
/// Holds no state of its own; everything lives in the event repository.
#[derive(Clone)]
pub struct ProgressService {
    events: Arc<dyn EventRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Check that a draft carries every required field.
    ///
    /// # Errors
    ///
    /// Returns `EventValidationError` naming the missing fields.
    pub fn validate(&self, draft: EventDraft) -> Result<NewEvent, EventValidationError> {
        draft.validate()
    }

    /// Validate and persist one event.
    ///
    /// Not idempotent: submitting the same event twice stores two records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` without touching storage if fields are missing.
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn ingest(
        &self,
        draft: EventDraft,
    ) -> Result<CourseProgressEvent, ProgressServiceError> {
        let event = self.validate(draft).inspect_err(|e| {
            warn!(error = %e, "rejected progress event");
        })?;

        let stored = self.events.create(event).await.inspect_err(|e| {
            error!(error = %e, "failed to store progress event");
        })?;

        info!(
            event_id = %stored.id(),
            user_id = stored.user_id(),
            course_id = stored.course_id(),
            event_type = stored.event_type().as_str(),
            "progress event stored"
        );
        Ok(stored)
    }

    /// All events for a user, ascending by timestamp.
    ///
    /// An unknown user yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn history_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<CourseProgressEvent>, ProgressServiceError> {
        let events = self.events.find_by_user(user_id).await?;
        debug!(user_id, count = events.len(), "loaded user history");
        Ok(events)
    }

    /// Participation and pass-rate statistics for one course.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn analyze(&self, course_id: &str) -> Result<CourseStats, ProgressServiceError> {
        let events = self.events.find_by_course(course_id).await?;
        let stats = CourseStats::from_events(&events);
        info!(
            course_id,
            events = events.len(),
            started = stats.participants_started,
            passed = stats.participants_passed,
            failed = stats.participants_failed,
            pass_rate = stats.pass_rate,
            "analyzed course"
        );
        Ok(stats)
    }
}
