mod event;
mod ids;

pub use event::{
    CourseProgressEvent, EventDraft, EventField, EventType, EventValidationError, NewEvent,
};
pub use ids::EventId;
