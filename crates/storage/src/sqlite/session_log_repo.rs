use super::{SqliteRepository, mapping::map_log_row};
use crate::repository::{SESSION_LOG_CAP, SessionLogRecord, SessionLogRepository, StorageError};

#[async_trait::async_trait]
impl SessionLogRepository for SqliteRepository {
    async fn append_log(&self, record: &SessionLogRecord) -> Result<i64, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let result = sqlx::query(
            r"
            INSERT INTO session_logs (
                kind, mode, total, correct, accuracy, duration_secs, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(record.kind.as_str())
        .bind(record.mode.map(|m| m.as_str()))
        .bind(i64::from(record.total))
        .bind(i64::from(record.correct))
        .bind(record.accuracy)
        .bind(record.duration_secs)
        .bind(record.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = result.last_insert_rowid();

        // Keep only the newest entries; the log is an analytics window,
        // not a full history.
        sqlx::query(
            r"
            DELETE FROM session_logs
            WHERE id NOT IN (
                SELECT id FROM session_logs ORDER BY id DESC LIMIT ?1
            )
            ",
        )
        .bind(i64::try_from(SESSION_LOG_CAP).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(id)
    }

    async fn list_logs(&self, limit: u32) -> Result<Vec<SessionLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, kind, mode, total, correct, accuracy, duration_secs, recorded_at
            FROM session_logs
            ORDER BY id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_log_row(&row)?);
        }
        Ok(records)
    }
}
