use lingua_core::model::{
    CardStatus, CefrLevel, PlacementOutcome, ProduceSubmission, ReviewCard, StudyMode, TopicId,
    TopicProgress,
};
use sqlx::Row;

use crate::repository::{SessionKind, SessionLogRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn parse_mode(s: &str) -> Result<StudyMode, StorageError> {
    s.parse::<StudyMode>().map_err(ser)
}

pub(crate) fn parse_status(s: &str) -> Result<CardStatus, StorageError> {
    s.parse::<CardStatus>().map_err(ser)
}

pub(crate) fn parse_level(s: &str) -> Result<CefrLevel, StorageError> {
    s.parse::<CefrLevel>().map_err(ser)
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Spelling samples are stored as a compact string of `1`/`0` marks,
/// oldest first.
pub(crate) fn encode_samples(samples: &[bool]) -> String {
    samples.iter().map(|&s| if s { '1' } else { '0' }).collect()
}

pub(crate) fn decode_samples(encoded: &str) -> Result<Vec<bool>, StorageError> {
    encoded
        .chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(StorageError::Serialization(format!(
                "invalid spelling sample mark: {other}"
            ))),
        })
        .collect()
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewCard, StorageError> {
    let mode = parse_mode(row.try_get::<String, _>("mode").map_err(ser)?.as_str())?;
    let status = parse_status(row.try_get::<String, _>("status").map_err(ser)?.as_str())?;

    ReviewCard::from_persisted(
        row.try_get::<String, _>("word").map_err(ser)?,
        mode,
        status,
        row.try_get("ease_factor").map_err(ser)?,
        u32_from_i64(
            "interval_days",
            row.try_get::<i64, _>("interval_days").map_err(ser)?,
        )?,
        u32_from_i64(
            "repetitions",
            row.try_get::<i64, _>("repetitions").map_err(ser)?,
        )?,
        u32_from_i64("lapses", row.try_get::<i64, _>("lapses").map_err(ser)?)?,
        usize::try_from(row.try_get::<i64, _>("learning_step").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("invalid learning_step".into()))?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("next_review_at").map_err(ser)?,
        row.try_get("last_review_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
    submissions: Vec<ProduceSubmission>,
) -> Result<TopicProgress, StorageError> {
    let topic_id =
        TopicId::new(row.try_get::<String, _>("topic_id").map_err(ser)?).map_err(ser)?;

    let review = match (
        row.try_get::<Option<f64>, _>("review_accuracy").map_err(ser)?,
        row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("review_last_at")
            .map_err(ser)?,
    ) {
        (Some(accuracy), Some(last_review_at)) => Some(lingua_core::model::ReviewRecord {
            accuracy,
            last_review_at,
        }),
        (None, None) => None,
        _ => {
            return Err(StorageError::Serialization(
                "review accuracy and timestamp must be stored together".into(),
            ));
        }
    };

    Ok(TopicProgress::from_persisted(
        topic_id,
        row.try_get("discover_done").map_err(ser)?,
        row.try_get("understand_done").map_err(ser)?,
        row.try_get("notice_done").map_err(ser)?,
        lingua_core::model::PracticeRecord {
            completed: row.try_get("practice_completed").map_err(ser)?,
            last_score: row.try_get("practice_last_score").map_err(ser)?,
            attempts: u32_from_i64(
                "practice_attempts",
                row.try_get::<i64, _>("practice_attempts").map_err(ser)?,
            )?,
        },
        submissions,
        u32_from_i64(
            "input_flood_reads",
            row.try_get::<i64, _>("input_flood_reads").map_err(ser)?,
        )?,
        review,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    ))
}

pub(crate) fn map_submission_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProduceSubmission, StorageError> {
    Ok(ProduceSubmission {
        text: row.try_get("body").map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

pub(crate) fn map_outcome_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<PlacementOutcome, StorageError> {
    Ok(PlacementOutcome {
        grammar: parse_level(row.try_get::<String, _>("grammar_level").map_err(ser)?.as_str())?,
        vocabulary: parse_level(
            row.try_get::<String, _>("vocabulary_level")
                .map_err(ser)?
                .as_str(),
        )?,
        reading: parse_level(row.try_get::<String, _>("reading_level").map_err(ser)?.as_str())?,
        listening: parse_level(
            row.try_get::<String, _>("listening_level")
                .map_err(ser)?
                .as_str(),
        )?,
        overall: parse_level(row.try_get::<String, _>("overall_level").map_err(ser)?.as_str())?,
        finished_at: row.try_get("finished_at").map_err(ser)?,
    })
}

pub(crate) fn map_log_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionLogRecord, StorageError> {
    let kind = SessionKind::parse(row.try_get::<String, _>("kind").map_err(ser)?.as_str())?;
    let mode = row
        .try_get::<Option<String>, _>("mode")
        .map_err(ser)?
        .map(|m| parse_mode(&m))
        .transpose()?;

    Ok(SessionLogRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        kind,
        mode,
        total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        accuracy: row.try_get("accuracy").map_err(ser)?,
        duration_secs: row.try_get("duration_secs").map_err(ser)?,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
