use chrono::{DateTime, Utc};
use std::fmt;

use lingua_core::model::{AnswerRecord, Quality, ReviewCard, SessionSummary, StudyMode};

use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::review_service::ReviewService;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory review session for one study mode.
///
/// Holds the shuffled queue and steps through it sequentially, applying
/// ratings via `ReviewService`. Purely ephemeral: dropping an unfinished
/// session discards the queue, while answers already applied to cards
/// stand.
pub struct StudySession {
    mode: StudyMode,
    cards: Vec<ReviewCard>,
    current: usize,
    records: Vec<AnswerRecord>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    log_id: Option<i64>,
}

impl StudySession {
    /// Create a session over a pre-built card queue.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no cards are provided.
    pub fn new(
        mode: StudyMode,
        cards: Vec<ReviewCard>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            mode,
            cards,
            current: 0,
            records: Vec::new(),
            started_at,
            completed_at: None,
            log_id: None,
        })
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
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn log_id(&self) -> Option<i64> {
        self.log_id
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    /// Total number of cards in this session.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.cards.len()
    }

    /// Number of cards that have already been answered.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.records.len()
    }

    /// Number of remaining cards that have not been answered yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.current)
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.total_cards();
        let answered = self.answered_count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64
        };
        SessionProgress {
            total,
            answered,
            remaining: self.remaining(),
            ratio,
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&ReviewCard> {
        self.cards.get(self.current)
    }

    pub(crate) fn current_card_mut(&mut self) -> Option<&mut ReviewCard> {
        self.cards.get_mut(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Apply a rating to the current card and advance the session.
    ///
    /// In-memory variant: the card mutates but nothing is persisted. The
    /// persisted path lives in `SessionLoopService`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already
    /// finished.
    pub fn answer_current(
        &mut self,
        review_service: &ReviewService,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&AnswerRecord, SessionError> {
        let result = {
            let Some(card) = self.current_card_mut() else {
                return Err(SessionError::Completed);
            };
            review_service.review_card(card, quality, reviewed_at)
        };

        self.record_answer(result.record, reviewed_at)
    }

    pub(crate) fn record_answer(
        &mut self,
        record: AnswerRecord,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&AnswerRecord, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }

        self.records.push(record);

        self.current += 1;
        if self.current >= self.cards.len() {
            self.completed_at = Some(reviewed_at);
        }

        self.records.last().ok_or(SessionError::Completed)
    }

    /// Aggregate the answered cards into a summary.
    ///
    /// # Errors
    ///
    /// Propagates summary validation errors.
    pub fn summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        Ok(SessionSummary::from_records(
            self.mode,
            self.started_at,
            completed_at,
            &self.records,
        )?)
    }

    pub(crate) fn set_log_id(&mut self, id: i64) {
        self.log_id = Some(id);
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("mode", &self.mode)
            .field("cards_len", &self.cards.len())
            .field("current", &self.current)
            .field("records_len", &self.records.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("log_id", &self.log_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::Clock;
    use lingua_core::model::CardStatus;
    use lingua_core::time::fixed_now;

    fn build_card(word: &str) -> ReviewCard {
        ReviewCard::new(word, StudyMode::Receptive, fixed_now()).unwrap()
    }

    #[test]
    fn empty_session_returns_error() {
        let err = StudySession::new(StudyMode::Receptive, Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn session_advances_and_completes() {
        let mut session = StudySession::new(
            StudyMode::Receptive,
            vec![build_card("eins"), build_card("zwei")],
            fixed_now(),
        )
        .unwrap();
        let review_service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        assert!(!session.is_complete());
        let first_word = session.current_card().unwrap().word().to_owned();
        let res1 = session
            .answer_current(&review_service, Quality::Good, fixed_now())
            .unwrap();
        assert_eq!(res1.word, first_word);
        assert_eq!(session.answered_count(), 1);
        assert!(!session.is_complete());

        let second_word = session.current_card().unwrap().word().to_owned();
        let res2 = session
            .answer_current(&review_service, Quality::Hard, fixed_now())
            .unwrap();
        assert_eq!(res2.word, second_word);
        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(fixed_now()));
        assert!(session.current_card().is_none());
    }

    #[test]
    fn answering_a_finished_session_errors() {
        let mut session =
            StudySession::new(StudyMode::Receptive, vec![build_card("eins")], fixed_now()).unwrap();
        let review_service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        session
            .answer_current(&review_service, Quality::Good, fixed_now())
            .unwrap();
        let err = session
            .answer_current(&review_service, Quality::Good, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Completed));
    }

    #[test]
    fn progress_reports_ratio() {
        let mut session = StudySession::new(
            StudyMode::Productive,
            vec![build_card("eins"), build_card("zwei"), build_card("drei"), build_card("vier")],
            fixed_now(),
        )
        .unwrap();
        let review_service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        assert!((session.progress().ratio - 0.0).abs() < f64::EPSILON);

        session
            .answer_current(&review_service, Quality::Good, fixed_now())
            .unwrap();
        let progress = session.progress();
        assert_eq!(progress.total, 4);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 3);
        assert!((progress.ratio - 0.25).abs() < f64::EPSILON);
        assert!(!progress.is_complete);
    }

    #[test]
    fn session_mutates_cards_through_scheduler() {
        let mut session =
            StudySession::new(StudyMode::Receptive, vec![build_card("eins")], fixed_now()).unwrap();
        let review_service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        session
            .answer_current(&review_service, Quality::Easy, fixed_now())
            .unwrap();

        // Easy on a new card graduates straight to review at 4 days.
        assert_eq!(session.cards[0].status(), CardStatus::Review);
        assert_eq!(session.cards[0].interval_days(), 4);
    }

    #[test]
    fn summary_counts_correct_answers_only_at_good_or_better() {
        let mut session = StudySession::new(
            StudyMode::Receptive,
            vec![build_card("eins"), build_card("zwei"), build_card("drei")],
            fixed_now(),
        )
        .unwrap();
        let review_service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        for quality in [Quality::Hard, Quality::Good, Quality::Again] {
            session
                .answer_current(&review_service, quality, fixed_now())
                .unwrap();
        }

        let summary = session.summary(fixed_now()).unwrap();
        assert_eq!(summary.total_answers(), 3);
        // Hard succeeded for scheduling purposes but is not "correct" here.
        assert_eq!(summary.correct(), 1);
    }
}
