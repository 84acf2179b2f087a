use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates the append-only event table and its lookup indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: event log.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // `seq` gives a stable insertion order for timestamp ties.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS course_progress_events (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    user_id TEXT NOT NULL CHECK (user_id <> ''),
                    course_id TEXT NOT NULL CHECK (course_id <> ''),
                    occurred_at_secs INTEGER NOT NULL,
                    occurred_at_nanos INTEGER NOT NULL
                        CHECK (occurred_at_nanos >= 0 AND occurred_at_nanos < 2000000000),
                    event_type TEXT NOT NULL
                        CHECK (event_type IN ('started', 'passed', 'failed'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_events_user_occurred
                    ON course_progress_events (
                        user_id, occurred_at_secs, occurred_at_nanos, seq
                    );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_events_course
                    ON course_progress_events (course_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
