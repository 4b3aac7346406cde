use chrono::{DateTime, Utc};
use lingua_core::model::{ReviewCard, SpellingTracker, StudyMode};

use super::{
    SqliteRepository,
    mapping::{decode_samples, encode_samples, map_card_row},
};
use crate::repository::{CardRepository, StorageError};

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn upsert_card(&self, card: &ReviewCard) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO vocabulary_cards (
                word, mode, status, ease_factor, interval_days, repetitions,
                lapses, learning_step, created_at, next_review_at, last_review_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(word, mode) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                status = excluded.status,
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                lapses = excluded.lapses,
                learning_step = excluded.learning_step,
                next_review_at = excluded.next_review_at,
                last_review_at = excluded.last_review_at
            ",
        )
        .bind(card.word())
        .bind(card.mode().as_str())
        .bind(card.status().as_str())
        .bind(card.ease_factor())
        .bind(i64::from(card.interval_days()))
        .bind(i64::from(card.repetitions()))
        .bind(i64::from(card.lapses()))
        .bind(
            i64::try_from(card.learning_step())
                .map_err(|_| StorageError::Serialization("learning_step overflow".into()))?,
        )
        .bind(card.created_at())
        .bind(card.next_review_at())
        .bind(card.last_review_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_card(&self, word: &str, mode: StudyMode) -> Result<ReviewCard, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                word, mode, status, ease_factor, interval_days, repetitions,
                lapses, learning_step, created_at, next_review_at, last_review_at
            FROM vocabulary_cards
            WHERE word = ?1 AND mode = ?2
            ",
        )
        .bind(word)
        .bind(mode.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_card_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn due_cards(
        &self,
        mode: StudyMode,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewCard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                word, mode, status, ease_factor, interval_days, repetitions,
                lapses, learning_step, created_at, next_review_at, last_review_at
            FROM vocabulary_cards
            WHERE mode = ?1
              AND status != 'new'
              AND next_review_at <= ?2
            ORDER BY next_review_at ASC, word ASC
            LIMIT ?3
            ",
        )
        .bind(mode.as_str())
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn new_cards(
        &self,
        mode: StudyMode,
        limit: u32,
    ) -> Result<Vec<ReviewCard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                word, mode, status, ease_factor, interval_days, repetitions,
                lapses, learning_step, created_at, next_review_at, last_review_at
            FROM vocabulary_cards
            WHERE mode = ?1
              AND status = 'new'
            ORDER BY created_at ASC, word ASC
            LIMIT ?2
            ",
        )
        .bind(mode.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn get_spelling(&self, word: &str) -> Result<SpellingTracker, StorageError> {
        let row = sqlx::query("SELECT samples FROM spelling_samples WHERE word = ?1")
            .bind(word)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let encoded: String = sqlx::Row::try_get(&row, "samples")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(SpellingTracker::from_samples(decode_samples(&encoded)?))
            }
            None => Ok(SpellingTracker::new()),
        }
    }

    async fn save_spelling(
        &self,
        word: &str,
        tracker: &SpellingTracker,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO spelling_samples (word, samples)
            VALUES (?1, ?2)
            ON CONFLICT(word) DO UPDATE SET samples = excluded.samples
            ",
        )
        .bind(word)
        .bind(encode_samples(&tracker.samples()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
