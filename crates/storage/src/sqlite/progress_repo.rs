use lingua_core::model::{TopicId, TopicProgress};

use super::{
    SqliteRepository,
    mapping::{map_progress_row, map_submission_row},
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO topic_progress (
                topic_id, discover_done, understand_done, notice_done,
                practice_completed, practice_last_score, practice_attempts,
                input_flood_reads, review_accuracy, review_last_at,
                started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(topic_id) DO UPDATE SET
                discover_done = excluded.discover_done,
                understand_done = excluded.understand_done,
                notice_done = excluded.notice_done,
                practice_completed = excluded.practice_completed,
                practice_last_score = excluded.practice_last_score,
                practice_attempts = excluded.practice_attempts,
                input_flood_reads = excluded.input_flood_reads,
                review_accuracy = excluded.review_accuracy,
                review_last_at = excluded.review_last_at,
                completed_at = excluded.completed_at
            ",
        )
        .bind(progress.topic_id().value())
        .bind(progress.discover_done())
        .bind(progress.understand_done())
        .bind(progress.notice_done())
        .bind(progress.practice().completed)
        .bind(progress.practice().last_score)
        .bind(i64::from(progress.practice().attempts))
        .bind(i64::from(progress.input_flood_reads()))
        .bind(progress.review().map(|r| r.accuracy))
        .bind(progress.review().map(|r| r.last_review_at))
        .bind(progress.started_at())
        .bind(progress.completed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Submissions are replaced wholesale; the list is small and
        // append-only in practice.
        sqlx::query("DELETE FROM produce_submissions WHERE topic_id = ?1")
            .bind(progress.topic_id().value())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for submission in progress.produce_submissions() {
            sqlx::query(
                r"
                INSERT INTO produce_submissions (topic_id, body, submitted_at)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(progress.topic_id().value())
            .bind(submission.text.as_str())
            .bind(submission.submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_progress(
        &self,
        topic_id: &TopicId,
    ) -> Result<Option<TopicProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                topic_id, discover_done, understand_done, notice_done,
                practice_completed, practice_last_score, practice_attempts,
                input_flood_reads, review_accuracy, review_last_at,
                started_at, completed_at
            FROM topic_progress
            WHERE topic_id = ?1
            ",
        )
        .bind(topic_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let submission_rows = sqlx::query(
            r"
            SELECT body, submitted_at
            FROM produce_submissions
            WHERE topic_id = ?1
            ORDER BY submitted_at ASC, id ASC
            ",
        )
        .bind(topic_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut submissions = Vec::with_capacity(submission_rows.len());
        for sub_row in submission_rows {
            submissions.push(map_submission_row(&sub_row)?);
        }

        Ok(Some(map_progress_row(&row, submissions)?))
    }
}
