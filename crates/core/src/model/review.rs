use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::card::StudyMode;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur during review operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid quality rating value: {0}")]
    InvalidQuality(u8),
}

//
// ─── QUALITY ──────────────────────────────────────────────────────────────────
//

/// Four-level self-reported recall rating for a flashcard answer.
///
/// - `Again`: Failed to recall, card needs immediate review
/// - `Hard`: Recalled with significant difficulty
/// - `Good`: Recalled correctly with appropriate effort
/// - `Easy`: Recalled instantly with no effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    /// Failed to recall the answer. Card will be shown again soon.
    Again,
    /// Recalled with significant difficulty. Interval increases slowly.
    Hard,
    /// Recalled correctly with appropriate effort. Standard interval increase.
    Good,
    /// Recalled instantly. Interval increases significantly.
    Easy,
}

impl Quality {
    /// Converts a numeric rating (0-3) to a `Quality`.
    ///
    /// This is the caller boundary for rating input: anything outside 0-3
    /// is rejected here, so the scheduler itself never sees an invalid
    /// rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidQuality` if the value is not in 0-3.
    pub fn from_u8(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidQuality(value)),
        }
    }

    /// Maps this rating onto the 2-5 slice of the classic SM-2 0-5 scale.
    #[must_use]
    pub fn to_sm2_quality(self) -> u8 {
        match self {
            Quality::Again => 2,
            Quality::Hard => 3,
            Quality::Good => 4,
            Quality::Easy => 5,
        }
    }

    /// Whether this rating counts as "correct" in session summaries.
    ///
    /// Display-only notion: the scheduler treats `Hard` as a successful
    /// review, the summary does not. Keep the two separate.
    #[must_use]
    pub fn counts_as_correct(self) -> bool {
        matches!(self, Quality::Good | Quality::Easy)
    }
}

//
// ─── ANSWER RECORD ────────────────────────────────────────────────────────────
//

/// Record of a single answered card within a review session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub word: String,
    pub mode: StudyMode,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(
        word: impl Into<String>,
        mode: StudyMode,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            word: word.into(),
            mode,
            quality,
            reviewed_at,
        }
    }
}

//
// ─── SESSION SUMMARY ──────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },

    #[error("total answers ({total}) does not match rating counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate summary for a completed review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    mode: StudyMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_answers: u32,
    again: u32,
    hard: u32,
    good: u32,
    easy: u32,
}

impl SessionSummary {
    /// Rehydrate a session summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::CountMismatch` if totals do not align.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        mode: StudyMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_answers: u32,
        again: u32,
        hard: u32,
        good: u32,
        easy: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let sum = again + hard + good + easy;
        if sum != total_answers {
            return Err(SessionSummaryError::CountMismatch {
                total: total_answers,
                sum,
            });
        }

        Ok(Self {
            mode,
            started_at,
            completed_at,
            total_answers,
            again,
            hard,
            good,
            easy,
        })
    }

    /// Build a summary from a session's answer records.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is
    /// before `started_at`, or `SessionSummaryError::TooManyAnswers` if the
    /// record count cannot fit in `u32`.
    pub fn from_records(
        mode: StudyMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        records: &[AnswerRecord],
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let mut again = 0_u32;
        let mut hard = 0_u32;
        let mut good = 0_u32;
        let mut easy = 0_u32;

        for record in records {
            match record.quality {
                Quality::Again => again = again.saturating_add(1),
                Quality::Hard => hard = hard.saturating_add(1),
                Quality::Good => good = good.saturating_add(1),
                Quality::Easy => easy = easy.saturating_add(1),
            }
        }

        let total_answers = u32::try_from(records.len())
            .map_err(|_| SessionSummaryError::TooManyAnswers { len: records.len() })?;

        Self::from_persisted(
            mode,
            started_at,
            completed_at,
            total_answers,
            again,
            hard,
            good,
            easy,
        )
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_answers(&self) -> u32 {
        self.total_answers
    }

    #[must_use]
    pub fn again(&self) -> u32 {
        self.again
    }

    #[must_use]
    pub fn hard(&self) -> u32 {
        self.hard
    }

    #[must_use]
    pub fn good(&self) -> u32 {
        self.good
    }

    #[must_use]
    pub fn easy(&self) -> u32 {
        self.easy
    }

    /// Answers rated at least `Good`, per [`Quality::counts_as_correct`].
    #[must_use]
    pub fn correct(&self) -> u32 {
        self.good + self.easy
    }

    /// Fraction of answers that count as correct; 0 for an empty session.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_answers == 0 {
            return 0.0;
        }
        f64::from(self.correct()) / f64::from(self.total_answers)
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
