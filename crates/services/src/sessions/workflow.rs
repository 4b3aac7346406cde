use std::sync::Arc;

use lingua_core::model::{AnswerRecord, Quality, StudyMode};
use storage::repository::{CardRepository, SessionLogRecord, SessionLogRepository};

use super::progress::SessionProgress;
use super::queries::SessionQueries;
use super::service::StudySession;
use crate::Clock;
use crate::error::SessionError;

/// Result of answering a single card in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub record: AnswerRecord,
    pub spelling_correct: Option<bool>,
    pub progress: SessionProgress,
    pub is_complete: bool,
    pub log_id: Option<i64>,
}

/// Orchestrates session start and persisted answering.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    cards: Arc<dyn CardRepository>,
    session_logs: Arc<dyn SessionLogRepository>,
    shuffle: bool,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        cards: Arc<dyn CardRepository>,
        session_logs: Arc<dyn SessionLogRepository>,
    ) -> Self {
        Self {
            clock,
            cards,
            session_logs,
            shuffle: true,
        }
    }

    /// Disable queue shuffling (deterministic tests only).
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a new session for the given mode, at most `limit` cards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when nothing is due and nothing is
    /// new, and `SessionError::Storage` on repository failures.
    pub async fn start_session(
        &self,
        mode: StudyMode,
        limit: u32,
    ) -> Result<StudySession, SessionError> {
        let now = self.clock.now();
        let session =
            SessionQueries::start_from_storage(mode, limit, self.cards.as_ref(), now, self.shuffle)
                .await?;
        log::info!(
            "started {mode} session with {} cards",
            session.total_cards()
        );
        Ok(session)
    }

    /// Answer the current card: advance + persist the card, record the
    /// outcome, optionally sample spelling, and append the analytics log
    /// when the session completes.
    ///
    /// The card update is atomic: if persistence fails the in-memory card
    /// rolls back and no outcome is recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for review or persistence failures.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        quality: Quality,
        typed_answer: Option<&str>,
    ) -> Result<SessionAnswerResult, SessionError> {
        let review_service = crate::review_service::ReviewService::new().with_clock(self.clock);
        let reviewed_at = self.clock.now();

        let (word, result) = {
            let Some(card) = session.current_card_mut() else {
                return Err(SessionError::Completed);
            };
            let word = card.word().to_owned();
            let result = review_service
                .review_card_persisted(card, quality, reviewed_at, self.cards.as_ref())
                .await?;
            (word, result)
        };

        // Productive answers typed by the learner feed the per-word
        // spelling window.
        let spelling_correct = match (session.mode(), typed_answer) {
            (StudyMode::Productive, Some(given)) => {
                let mut tracker = self.cards.get_spelling(&word).await?;
                let correct = tracker.record(&word, given);
                self.cards.save_spelling(&word, &tracker).await?;
                Some(correct)
            }
            _ => None,
        };

        let record = session.record_answer(result.record, reviewed_at)?.clone();

        if session.is_complete() && session.log_id().is_none() {
            let completed_at = session.completed_at().ok_or(SessionError::Completed)?;
            let summary = session.summary(completed_at)?;
            let log_id = self
                .session_logs
                .append_log(&SessionLogRecord::from_summary(&summary))
                .await?;
            session.set_log_id(log_id);
            log::info!(
                "completed {} session: {}/{} correct",
                session.mode(),
                summary.correct(),
                summary.total_answers()
            );
        }

        Ok(SessionAnswerResult {
            record,
            spelling_correct,
            progress: session.progress(),
            is_complete: session.is_complete(),
            log_id: session.log_id(),
        })
    }

    /// Retry analytics-log persistence after a completed session.
    ///
    /// Useful when the final append failed on a transient storage error.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is not complete,
    /// `SessionError::Storage` if persistence fails again.
    pub async fn finalize_log(&self, session: &mut StudySession) -> Result<i64, SessionError> {
        if let Some(id) = session.log_id() {
            return Ok(id);
        }

        if !session.is_complete() {
            return Err(SessionError::Completed);
        }

        let completed_at = session.completed_at().ok_or(SessionError::Completed)?;
        let summary = session.summary(completed_at)?;
        let id = self
            .session_logs
            .append_log(&SessionLogRecord::from_summary(&summary))
            .await?;
        session.set_log_id(id);
        Ok(id)
    }
}
