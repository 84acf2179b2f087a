use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{CourseProgressEvent, EventType};

/// Participation and pass-rate statistics for one course.
///
/// Counts are distinct users, not events: a user who starts a course three
/// times is one started participant. The three sets are independent, so a user
/// who failed once and later passed counts toward both.
///
/// # Examples
///
/// ```
/// # use progress_core::CourseStats;
/// # use progress_core::model::{EventDraft, EventId, EventType};
/// # use progress_core::time::fixed_now;
/// let events: Vec<_> = [
///     ("u1", EventType::Started),
///     ("u1", EventType::Started),
///     ("u1", EventType::Passed),
///     ("u2", EventType::Started),
///     ("u2", EventType::Failed),
/// ]
/// .into_iter()
/// .map(|(user, kind)| {
///     EventDraft::new(user, "c1", fixed_now(), kind)
///         .validate()
///         .unwrap()
///         .into_stored(EventId::generate())
/// })
/// .collect();
///
/// let stats = CourseStats::from_events(&events);
/// assert_eq!(stats.participants_started, 2);
/// assert_eq!(stats.participants_passed, 1);
/// assert_eq!(stats.participants_failed, 1);
/// assert_eq!(stats.pass_rate, 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    pub participants_started: u64,
    pub participants_passed: u64,
    pub participants_failed: u64,
    pub pass_rate: f64,
}

impl CourseStats {
    /// Aggregate a course's events. Iteration order does not matter.
    ///
    /// Callers pass the events of a single course; no filtering happens here.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a CourseProgressEvent>,
    {
        let mut started: HashSet<&str> = HashSet::new();
        let mut passed: HashSet<&str> = HashSet::new();
        let mut failed: HashSet<&str> = HashSet::new();

        for event in events {
            let bucket = match event.event_type() {
                EventType::Started => &mut started,
                EventType::Passed => &mut passed,
                EventType::Failed => &mut failed,
            };
            bucket.insert(event.user_id());
        }

        let participants_passed = count(&passed);
        let participants_failed = count(&failed);

        Self {
            participants_started: count(&started),
            participants_passed,
            participants_failed,
            pass_rate: pass_rate(participants_passed, participants_failed),
        }
    }
}

/// Percentage of concluding participants who passed.
///
/// Returns exactly `0.0` when nobody has concluded.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pass_rate(passed: u64, failed: u64) -> f64 {
    let concluded = passed.saturating_add(failed);
    if concluded == 0 {
        return 0.0;
    }
    passed as f64 * 100.0 / concluded as f64
}

fn count(users: &HashSet<&str>) -> u64 {
    u64::try_from(users.len()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventDraft, EventId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn events(course: &str, steps: &[(&str, EventType)]) -> Vec<CourseProgressEvent> {
        steps.iter()
            .enumerate()
            .map(|(i, (user, kind))| {
                let at = fixed_now() + Duration::minutes(i64::try_from(i).unwrap());
                EventDraft::new(*user, course, at, *kind)
                    .validate()
                    .unwrap()
                    .into_stored(EventId::generate())
            })
            .collect()
    }

    #[test]
    fn empty_course_is_all_zero() {
        let stats = CourseStats::from_events(std::iter::empty());
        assert_eq!(stats, CourseStats::default());
        assert_eq!(stats.pass_rate, 0.0);
    }

    #[test]
    fn counts_distinct_users_not_events() {
        let evs = events(
            "c1",
            &[
                ("u1", EventType::Started),
                ("u1", EventType::Started),
                ("u1", EventType::Passed),
                ("u2", EventType::Started),
                ("u2", EventType::Failed),
            ],
        );
        let stats = CourseStats::from_events(&evs);
        assert_eq!(
            stats,
            CourseStats {
                participants_started: 2,
                participants_passed: 1,
                participants_failed: 1,
                pass_rate: 50.0,
            }
        );
    }

    #[test]
    fn only_started_events_give_zero_rate() {
        let evs = events("c1", &[("u1", EventType::Started), ("u2", EventType::Started)]);
        let stats = CourseStats::from_events(&evs);
        assert_eq!(stats.participants_started, 2);
        assert_eq!(stats.participants_passed, 0);
        assert_eq!(stats.participants_failed, 0);
        assert_eq!(stats.pass_rate, 0.0);
        assert!(!stats.pass_rate.is_nan());
    }

    #[test]
    fn user_may_be_in_passed_and_failed() {
        let evs = events(
            "c1",
            &[
                ("u1", EventType::Failed),
                ("u1", EventType::Passed),
                ("u2", EventType::Passed),
            ],
        );
        let stats = CourseStats::from_events(&evs);
        assert_eq!(stats.participants_started, 0);
        assert_eq!(stats.participants_passed, 2);
        assert_eq!(stats.participants_failed, 1);
        assert!((stats.pass_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn result_is_independent_of_order() {
        let mut evs = events(
            "c1",
            &[
                ("u1", EventType::Started),
                ("u2", EventType::Failed),
                ("u3", EventType::Passed),
                ("u2", EventType::Started),
                ("u1", EventType::Passed),
            ],
        );
        let forward = CourseStats::from_events(&evs);
        evs.reverse();
        let backward = CourseStats::from_events(&evs);
        evs.rotate_left(2);
        let rotated = CourseStats::from_events(&evs);
        assert_eq!(forward, backward);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn pass_rate_edges() {
        assert_eq!(pass_rate(0, 0), 0.0);
        assert_eq!(pass_rate(3, 0), 100.0);
        assert_eq!(pass_rate(0, 4), 0.0);
        assert_eq!(pass_rate(1, 3), 25.0);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(CourseStats::default()).unwrap();
        assert_eq!(json["participantsStarted"], 0);
        assert_eq!(json["participantsPassed"], 0);
        assert_eq!(json["participantsFailed"], 0);
        assert_eq!(json["passRate"], 0.0);
    }
}
