use lingua_core::model::PlacementOutcome;

use super::{SqliteRepository, mapping::map_outcome_row};
use crate::repository::{PlacementRepository, StorageError};

#[async_trait::async_trait]
impl PlacementRepository for SqliteRepository {
    async fn save_outcome(&self, outcome: &PlacementOutcome) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO placement_outcomes (
                grammar_level, vocabulary_level, reading_level,
                listening_level, overall_level, finished_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(outcome.grammar.as_str())
        .bind(outcome.vocabulary.as_str())
        .bind(outcome.reading.as_str())
        .bind(outcome.listening.as_str())
        .bind(outcome.overall.as_str())
        .bind(outcome.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn latest_outcome(&self) -> Result<Option<PlacementOutcome>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                grammar_level, vocabulary_level, reading_level,
                listening_level, overall_level, finished_at
            FROM placement_outcomes
            ORDER BY finished_at DESC, id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| map_outcome_row(&row)).transpose()
    }
}
