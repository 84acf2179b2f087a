use chrono::Duration;
use progress_core::model::{EventDraft, EventType};
use progress_core::time::fixed_now;
use services::{AppServices, CourseStats, ProgressServiceError};

#[tokio::test]
async fn progress_flow_over_sqlite() {
    let url = "sqlite:file:memdb_progress_flow?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(url).await.expect("connect sqlite");
    let progress = services.progress();
    let course = "course-rust-101";

    // Submitted out of order to check history sorting.
    let steps = [
        ("u1", EventType::Passed, 30),
        ("u1", EventType::Started, 0),
        ("u2", EventType::Started, 5),
        ("u2", EventType::Failed, 25),
        ("u1", EventType::Started, 10),
    ];
    for (user, kind, minutes) in steps {
        progress
            .ingest(EventDraft::new(
                user,
                course,
                fixed_now() + Duration::minutes(minutes),
                kind,
            ))
            .await
            .expect("ingest");
    }

    let history = progress.history_for("u1").await.expect("history");
    let kinds: Vec<_> = history.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec![EventType::Started, EventType::Started, EventType::Passed]
    );
    assert!(history.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));

    let stats = progress.analyze(course).await.expect("analyze");
    assert_eq!(
        stats,
        CourseStats {
            participants_started: 2,
            participants_passed: 1,
            participants_failed: 1,
            pass_rate: 50.0,
        }
    );

    let err = progress
        .ingest(EventDraft {
            user_id: Some("u3".into()),
            ..EventDraft::default()
        })
        .await
        .expect_err("missing fields");
    assert!(matches!(err, ProgressServiceError::Validation(_)));
    assert_eq!(
        err.to_string(),
        "missing required fields: courseId, timestamp, eventType"
    );
    assert!(progress.history_for("u3").await.expect("history").is_empty());
}

#[tokio::test]
async fn in_memory_services_start_empty() {
    let progress = AppServices::in_memory().progress();
    assert_eq!(
        progress.analyze("any").await.expect("analyze"),
        CourseStats::default()
    );
}
