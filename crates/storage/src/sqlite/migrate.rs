use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (vocabulary cards, spelling samples, topic
/// progress with production submissions, placement outcomes, the capped
/// session log, and indexes).
#[allow(clippy::too_many_lines)]
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

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS vocabulary_cards (
                    word TEXT NOT NULL,
                    mode TEXT NOT NULL,
                    status TEXT NOT NULL,
                    ease_factor REAL NOT NULL CHECK (ease_factor > 0),
                    interval_days INTEGER NOT NULL CHECK (interval_days >= 0),
                    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
                    lapses INTEGER NOT NULL CHECK (lapses >= 0),
                    learning_step INTEGER NOT NULL CHECK (learning_step >= 0),
                    created_at TEXT NOT NULL,
                    next_review_at TEXT NOT NULL,
                    last_review_at TEXT,
                    PRIMARY KEY (word, mode)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS spelling_samples (
                    word TEXT PRIMARY KEY,
                    samples TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topic_progress (
                    topic_id TEXT PRIMARY KEY,
                    discover_done INTEGER NOT NULL CHECK (discover_done IN (0, 1)),
                    understand_done INTEGER NOT NULL CHECK (understand_done IN (0, 1)),
                    notice_done INTEGER NOT NULL CHECK (notice_done IN (0, 1)),
                    practice_completed INTEGER NOT NULL CHECK (practice_completed IN (0, 1)),
                    practice_last_score REAL,
                    practice_attempts INTEGER NOT NULL CHECK (practice_attempts >= 0),
                    input_flood_reads INTEGER NOT NULL CHECK (input_flood_reads >= 0),
                    review_accuracy REAL,
                    review_last_at TEXT,
                    started_at TEXT NOT NULL,
                    completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS produce_submissions (
                    id INTEGER PRIMARY KEY,
                    topic_id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    FOREIGN KEY (topic_id) REFERENCES topic_progress(topic_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS placement_outcomes (
                    id INTEGER PRIMARY KEY,
                    grammar_level TEXT NOT NULL,
                    vocabulary_level TEXT NOT NULL,
                    reading_level TEXT NOT NULL,
                    listening_level TEXT NOT NULL,
                    overall_level TEXT NOT NULL,
                    finished_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_logs (
                    id INTEGER PRIMARY KEY,
                    kind TEXT NOT NULL,
                    mode TEXT,
                    total INTEGER NOT NULL CHECK (total >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    accuracy REAL NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    recorded_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_cards_mode_next_review
                    ON vocabulary_cards(mode, next_review_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_cards_mode_status_created
                    ON vocabulary_cards(mode, status, created_at, word);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_submissions_topic
                    ON produce_submissions (topic_id, submitted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_placement_outcomes_finished
                    ON placement_outcomes (finished_at);
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
