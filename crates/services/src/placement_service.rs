use std::sync::Arc;

use rand::rng;
use rand::seq::IndexedRandom;

use lingua_core::model::{
    CefrLevel, LevelAdjustment, PlacementConfig, PlacementOutcome, PlacementQuestion,
    PlacementSession, Section,
};
use lingua_core::time::Clock;
use storage::repository::{
    PlacementRepository, SessionKind, SessionLogRecord, SessionLogRepository,
};

use crate::error::PlacementServiceError;

//
// ─── QUESTION BANK CONTRACT ────────────────────────────────────────────────────
//

/// Read-only, pre-authored question bank addressable by level and section.
pub trait QuestionBank: Send + Sync {
    fn questions_for(&self, level: CefrLevel, section: Section) -> Vec<PlacementQuestion>;
}

/// Result of grading one placement answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementAnswerResult {
    pub correct: bool,
    pub adjustment: Option<LevelAdjustment>,
    pub should_finish: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Runs the adaptive placement test against a question bank.
pub struct PlacementService {
    clock: Clock,
    bank: Arc<dyn QuestionBank>,
    placements: Arc<dyn PlacementRepository>,
    session_logs: Arc<dyn SessionLogRepository>,
    config: PlacementConfig,
}

impl PlacementService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<dyn QuestionBank>,
        placements: Arc<dyn PlacementRepository>,
        session_logs: Arc<dyn SessionLogRepository>,
    ) -> Self {
        Self {
            clock,
            bank,
            placements,
            session_logs,
            config: PlacementConfig::standard(),
        }
    }

    /// Override the test configuration.
    #[must_use]
    pub fn with_config(mut self, config: PlacementConfig) -> Self {
        self.config = config;
        self
    }

    /// Begin a new run at the given working level.
    #[must_use]
    pub fn start_session(&self, starting_level: CefrLevel) -> PlacementSession {
        log::info!("starting placement test at {starting_level}");
        PlacementSession::new(self.config.clone(), starting_level, self.clock.now())
    }

    /// Select the next question for the session.
    ///
    /// The section comes from the fixed rotation. Within a section, an
    /// unused question is drawn uniformly at random from the bank at the
    /// working level; an exhausted bank falls back to adjacent levels by
    /// distance (±1, then ±2). A section with nothing left anywhere cedes
    /// its turn to the next section, so the test keeps moving even with
    /// thin banks. Returns `None` only when every section is exhausted —
    /// the caller should then finish the run with whatever was answered.
    #[must_use]
    pub fn next_question(&self, session: &PlacementSession) -> Option<PlacementQuestion> {
        let asked = session.history().len();
        for offset in 0..Section::ROTATION.len() {
            let section = Section::ROTATION[(asked + offset) % Section::ROTATION.len()];
            if let Some(question) = self.pick_for_section(session, section) {
                return Some(question);
            }
            log::debug!("section {section} exhausted, trying next");
        }
        None
    }

    fn pick_for_section(
        &self,
        session: &PlacementSession,
        section: Section,
    ) -> Option<PlacementQuestion> {
        let current = session.current_level();
        for distance in 0..=2_usize {
            let candidates: Vec<PlacementQuestion> = CefrLevel::ORDER
                .into_iter()
                .filter(|level| level.distance(current) == distance)
                .flat_map(|level| self.bank.questions_for(level, section))
                .filter(|question| !session.is_question_used(question.id()))
                .collect();

            if !candidates.is_empty() {
                let mut rng = rng();
                return candidates.choose(&mut rng).cloned();
            }
        }
        None
    }

    /// Grade a learner's choice and record it on the session.
    ///
    /// # Errors
    ///
    /// Returns `PlacementServiceError::Placement` for a malformed answer
    /// index, a duplicate question, or a finished session.
    pub fn submit_answer(
        &self,
        session: &mut PlacementSession,
        question: &PlacementQuestion,
        choice: usize,
    ) -> Result<PlacementAnswerResult, PlacementServiceError> {
        let correct = question.grade(choice)?;
        let adjustment = session.record_answer(
            question.id().clone(),
            question.section(),
            question.level(),
            correct,
            self.clock.now(),
        )?;

        if let Some(adjustment) = adjustment {
            log::debug!(
                "placement level moved {} -> {} after {} questions",
                adjustment.from,
                adjustment.to,
                session.questions_asked()
            );
        }

        Ok(PlacementAnswerResult {
            correct,
            adjustment,
            should_finish: session.should_finish(),
        })
    }

    /// End the run: compute the final placement, persist it, and append
    /// the analytics log entry.
    ///
    /// # Errors
    ///
    /// Returns `PlacementServiceError::Placement` if the session was
    /// already finished and `PlacementServiceError::Storage` on
    /// persistence failures.
    pub async fn finish(
        &self,
        session: &mut PlacementSession,
    ) -> Result<PlacementOutcome, PlacementServiceError> {
        let now = self.clock.now();
        let total = session.questions_asked();
        let correct = u32::try_from(session.history().iter().filter(|a| a.correct).count())
            .unwrap_or(u32::MAX);
        let started_at = session.started_at();

        let outcome = session.finish(now)?;
        self.placements.save_outcome(&outcome).await?;

        let accuracy = if total == 0 {
            0.0
        } else {
            f64::from(correct) / f64::from(total)
        };
        self.session_logs
            .append_log(&SessionLogRecord {
                id: None,
                kind: SessionKind::PlacementTest,
                mode: None,
                total,
                correct,
                accuracy,
                duration_secs: (now - started_at).num_seconds(),
                recorded_at: now,
            })
            .await?;

        log::info!("placement finished: overall {}", outcome.overall);
        Ok(outcome)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{PlacementError, QuestionId};
    use lingua_core::time::fixed_clock;
    use std::collections::HashSet;
    use storage::repository::InMemoryRepository;

    /// Bank with a fixed number of questions per (section, level); the
    /// first choice is always the correct one.
    struct StubBank {
        per_cell: usize,
    }

    impl QuestionBank for StubBank {
        fn questions_for(&self, level: CefrLevel, section: Section) -> Vec<PlacementQuestion> {
            (0..self.per_cell)
                .map(|n| {
                    PlacementQuestion::new(
                        QuestionId::new(format!("{section}-{level}-{n}")).unwrap(),
                        section,
                        level,
                        format!("{section} question {n} at {level}"),
                        vec!["richtig".into(), "falsch".into(), "auch falsch".into()],
                        0,
                    )
                    .unwrap()
                })
                .collect()
        }
    }

    fn service(repo: &InMemoryRepository, per_cell: usize) -> PlacementService {
        PlacementService::new(
            fixed_clock(),
            Arc::new(StubBank { per_cell }),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[test]
    fn questions_follow_section_rotation() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 30);
        let mut session = service.start_session(CefrLevel::B1);

        for expected in [
            Section::Grammar,
            Section::Vocabulary,
            Section::Reading,
            Section::Listening,
            Section::Grammar,
        ] {
            let question = service.next_question(&session).unwrap();
            assert_eq!(question.section(), expected);
            assert_eq!(question.level(), CefrLevel::B1);
            service.submit_answer(&mut session, &question, 0).unwrap();
        }
    }

    #[test]
    fn exhausted_level_falls_back_to_adjacent() {
        let repo = InMemoryRepository::new();
        // One question per cell: the B1 grammar bank dries up after one ask.
        let service = service(&repo, 1);
        let mut session = service.start_session(CefrLevel::B1);

        let mut grammar_levels = Vec::new();
        // Walk a full rotation four times; each grammar pick exhausts one level.
        for _ in 0..16 {
            let question = service.next_question(&session).unwrap();
            if question.section() == Section::Grammar {
                grammar_levels.push(question.level());
            }
            service.submit_answer(&mut session, &question, 1).unwrap();
        }

        assert_eq!(grammar_levels[0], CefrLevel::B1);
        // Next grammar questions come from distance 1, then distance 2.
        assert_eq!(grammar_levels[1].distance(CefrLevel::B1), 1);
        assert!(grammar_levels.len() >= 3);
    }

    #[test]
    fn fully_exhausted_bank_yields_none() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 1);
        let mut session = service.start_session(CefrLevel::B1);

        // 4 sections x 5 levels x 1 question = 20 total. Mid-band accuracy
        // keeps the working level at B1, from which every level is within
        // fallback reach.
        let pattern = [0, 0, 1, 1, 1];
        for n in 0..20 {
            let question = service.next_question(&session).unwrap();
            service
                .submit_answer(&mut session, &question, pattern[n % pattern.len()])
                .unwrap();
        }

        assert_eq!(session.current_level(), CefrLevel::B1);
        assert!(service.next_question(&session).is_none());
    }

    #[test]
    fn submit_answer_rejects_malformed_choice() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 30);
        let mut session = service.start_session(CefrLevel::B1);

        let question = service.next_question(&session).unwrap();
        let err = service
            .submit_answer(&mut session, &question, 99)
            .unwrap_err();
        assert!(matches!(
            err,
            PlacementServiceError::Placement(PlacementError::ChoiceOutOfRange { .. })
        ));
        // The malformed answer was never recorded.
        assert_eq!(session.questions_asked(), 0);
    }

    #[test]
    fn selection_never_repeats_questions() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 30);
        let mut session = service.start_session(CefrLevel::B1);

        let mut seen = HashSet::new();
        for _ in 0..40 {
            let question = service.next_question(&session).unwrap();
            assert!(seen.insert(question.id().clone()), "question repeated");
            service.submit_answer(&mut session, &question, 0).unwrap();
        }
    }

    #[tokio::test]
    async fn finish_persists_outcome_and_log() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 30);
        let mut session = service.start_session(CefrLevel::A2);

        while !session.should_finish() {
            let question = service.next_question(&session).unwrap();
            service.submit_answer(&mut session, &question, 0).unwrap();
        }
        let outcome = service.finish(&mut session).await.unwrap();

        let stored = repo.latest_outcome().await.unwrap().unwrap();
        assert_eq!(stored, outcome);

        let logs = repo.list_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, SessionKind::PlacementTest);
        assert_eq!(logs[0].total, session.questions_asked());
        assert!((logs[0].accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn finish_twice_errors() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, 30);
        let mut session = service.start_session(CefrLevel::B1);

        let question = service.next_question(&session).unwrap();
        service.submit_answer(&mut session, &question, 0).unwrap();

        service.finish(&mut session).await.unwrap();
        let err = service.finish(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            PlacementServiceError::Placement(PlacementError::SessionFinished)
        ));
    }
}
