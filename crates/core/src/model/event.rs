use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::EventId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// A semantic field of a progress event, named as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    UserId,
    CourseId,
    Timestamp,
    EventType,
}

impl EventField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventField::UserId => "userId",
            EventField::CourseId => "courseId",
            EventField::Timestamp => "timestamp",
            EventField::EventType => "eventType",
        }
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when an incoming event is not fit for storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventValidationError {
    #[error("missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<EventField>),
}

impl EventValidationError {
    /// Fields that were absent, in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> &[EventField] {
        match self {
            EventValidationError::MissingFields(fields) => fields,
        }
    }
}

fn join_fields(fields: &[EventField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

//
// ─── EVENT TYPE ───────────────────────────────────────────────────────────────
//

/// Progress transition recorded by an event.
///
/// The set is closed: anything else is rejected before it reaches a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "STARTED", alias = "COURSE_STARTED")]
    Started,
    #[serde(rename = "PASSED", alias = "COURSE_PASSED")]
    Passed,
    #[serde(rename = "FAILED", alias = "COURSE_FAILED")]
    Failed,
}

impl EventType {
    /// Stable lowercase name used by storage backends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Started => "started",
            EventType::Passed => "passed",
            EventType::Failed => "failed",
        }
    }
}

//
// ─── DRAFT ────────────────────────────────────────────────────────────────────
//

/// Unvalidated event as submitted by a caller.
///
/// Any identifier the caller sends is not part of the draft; stores assign ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
}

impl EventDraft {
    /// Builds a draft with every field present.
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        event_type: EventType,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            course_id: Some(course_id.into()),
            timestamp: Some(timestamp),
            event_type: Some(event_type),
        }
    }

    /// Check that all four semantic fields are present.
    ///
    /// Empty strings count as absent. Values are passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns `EventValidationError::MissingFields` listing every absent field.
    pub fn validate(self) -> Result<NewEvent, EventValidationError> {
        let user_id = self.user_id.filter(|s| !s.is_empty());
        let course_id = self.course_id.filter(|s| !s.is_empty());

        match (user_id, course_id, self.timestamp, self.event_type) {
            (Some(user_id), Some(course_id), Some(timestamp), Some(event_type)) => Ok(NewEvent {
                user_id,
                course_id,
                timestamp,
                event_type,
            }),
            (user_id, course_id, timestamp, event_type) => {
                let mut missing = Vec::with_capacity(4);
                if user_id.is_none() {
                    missing.push(EventField::UserId);
                }
                if course_id.is_none() {
                    missing.push(EventField::CourseId);
                }
                if timestamp.is_none() {
                    missing.push(EventField::Timestamp);
                }
                if event_type.is_none() {
                    missing.push(EventField::EventType);
                }
                Err(EventValidationError::MissingFields(missing))
            }
        }
    }
}

//
// ─── VALIDATED EVENT ──────────────────────────────────────────────────────────
//

/// A validated event that has not been stored yet and so has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    user_id: String,
    course_id: String,
    timestamp: DateTime<Utc>,
    event_type: EventType,
}

impl NewEvent {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Attach a store-assigned id.
    #[must_use]
    pub fn into_stored(self, id: EventId) -> CourseProgressEvent {
        CourseProgressEvent {
            id,
            user_id: self.user_id,
            course_id: self.course_id,
            timestamp: self.timestamp,
            event_type: self.event_type,
        }
    }
}

//
// ─── STORED EVENT ─────────────────────────────────────────────────────────────
//

/// Immutable record of one progress transition as held by an event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressEvent {
    id: EventId,
    user_id: String,
    course_id: String,
    timestamp: DateTime<Utc>,
    event_type: EventType,
}

impl CourseProgressEvent {
    /// Rehydrate an event from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `EventValidationError` if the persisted user or course is empty.
    pub fn from_persisted(
        id: EventId,
        user_id: String,
        course_id: String,
        timestamp: DateTime<Utc>,
        event_type: EventType,
    ) -> Result<Self, EventValidationError> {
        let event = EventDraft {
            user_id: Some(user_id),
            course_id: Some(course_id),
            timestamp: Some(timestamp),
            event_type: Some(event_type),
        }
        .validate()?;
        Ok(event.into_stored(id))
    }

    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The semantic fields of this event, without its id.
    #[must_use]
    pub fn to_new_event(&self) -> NewEvent {
        NewEvent {
            user_id: self.user_id.clone(),
            course_id: self.course_id.clone(),
            timestamp: self.timestamp,
            event_type: self.event_type,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
