use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::level::{CefrLevel, Section};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PlacementError {
    #[error("question bounds invalid: min {min} must be > 0 and <= max {max}")]
    InvalidQuestionBounds { min: u32, max: u32 },

    #[error("stability window must be > 0")]
    InvalidStabilityWindow,

    #[error("adaptation window invalid: interval {interval}, minimum {minimum}")]
    InvalidAdaptationWindow { interval: usize, minimum: usize },

    #[error("{name} must be within (0, 1], got {provided}")]
    InvalidThreshold { name: &'static str, provided: f64 },

    #[error("demote threshold {demote} must be below promote threshold {promote}")]
    InvertedThresholds { demote: f64, promote: f64 },

    #[error("section minimum attempts must be > 0")]
    InvalidSectionMinAttempts,

    #[error("placement session is already finished")]
    SessionFinished,

    #[error("question {0} was already asked in this session")]
    DuplicateQuestion(QuestionId),

    #[error("a question needs at least two choices, got {provided}")]
    NotEnoughChoices { provided: usize },

    #[error("choice index {provided} out of range for {available} choices")]
    ChoiceOutOfRange { provided: usize, available: usize },
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Tuning parameters for the adaptive placement test.
///
/// The defaults trade test length against confidence: a learner whose
/// level stabilizes finishes at `min_questions`; one who keeps
/// oscillating is capped at `max_questions`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    min_questions: u32,
    max_questions: u32,
    stability_window: usize,
    adaptation_interval: usize,
    adaptation_min_answers: usize,
    promote_threshold: f64,
    demote_threshold: f64,
    section_pass_threshold: f64,
    section_min_attempts: u32,
}

impl PlacementConfig {
    /// Creates the standard test configuration.
    ///
    /// 50-70 questions, 10-answer stability window, adaptation over the
    /// last 5 answers with a 3-answer minimum at the current level,
    /// promotion at 70% accuracy and demotion below 40%.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            min_questions: 50,
            max_questions: 70,
            stability_window: 10,
            adaptation_interval: 5,
            adaptation_min_answers: 3,
            promote_threshold: 0.7,
            demote_threshold: 0.4,
            section_pass_threshold: 0.6,
            section_min_attempts: 2,
        }
    }

    /// Creates custom test parameters.
    ///
    /// # Errors
    ///
    /// Returns a `PlacementError` when any bound or threshold is
    /// inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        min_questions: u32,
        max_questions: u32,
        stability_window: usize,
        adaptation_interval: usize,
        adaptation_min_answers: usize,
        promote_threshold: f64,
        demote_threshold: f64,
        section_pass_threshold: f64,
        section_min_attempts: u32,
    ) -> Result<Self, PlacementError> {
        if min_questions == 0 || min_questions > max_questions {
            return Err(PlacementError::InvalidQuestionBounds {
                min: min_questions,
                max: max_questions,
            });
        }
        if stability_window == 0 {
            return Err(PlacementError::InvalidStabilityWindow);
        }
        if adaptation_interval == 0
            || adaptation_min_answers == 0
            || adaptation_min_answers > adaptation_interval
        {
            return Err(PlacementError::InvalidAdaptationWindow {
                interval: adaptation_interval,
                minimum: adaptation_min_answers,
            });
        }
        for (name, value) in [
            ("promote threshold", promote_threshold),
            ("demote threshold", demote_threshold),
            ("section pass threshold", section_pass_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(PlacementError::InvalidThreshold {
                    name,
                    provided: value,
                });
            }
        }
        if demote_threshold >= promote_threshold {
            return Err(PlacementError::InvertedThresholds {
                demote: demote_threshold,
                promote: promote_threshold,
            });
        }
        if section_min_attempts == 0 {
            return Err(PlacementError::InvalidSectionMinAttempts);
        }

        Ok(Self {
            min_questions,
            max_questions,
            stability_window,
            adaptation_interval,
            adaptation_min_answers,
            promote_threshold,
            demote_threshold,
            section_pass_threshold,
            section_min_attempts,
        })
    }

    // Accessors
    #[must_use]
    pub fn min_questions(&self) -> u32 {
        self.min_questions
    }

    #[must_use]
    pub fn max_questions(&self) -> u32 {
        self.max_questions
    }

    #[must_use]
    pub fn stability_window(&self) -> usize {
        self.stability_window
    }

    #[must_use]
    pub fn adaptation_interval(&self) -> usize {
        self.adaptation_interval
    }

    #[must_use]
    pub fn adaptation_min_answers(&self) -> usize {
        self.adaptation_min_answers
    }

    #[must_use]
    pub fn promote_threshold(&self) -> f64 {
        self.promote_threshold
    }

    #[must_use]
    pub fn demote_threshold(&self) -> f64 {
        self.demote_threshold
    }

    #[must_use]
    pub fn section_pass_threshold(&self) -> f64 {
        self.section_pass_threshold
    }

    #[must_use]
    pub fn section_min_attempts(&self) -> u32 {
        self.section_min_attempts
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One pre-authored multiple-choice question from a leveled bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementQuestion {
    id: QuestionId,
    section: Section,
    level: CefrLevel,
    prompt: String,
    choices: Vec<String>,
    correct_choice: usize,
}

impl PlacementQuestion {
    /// Creates a question, checking that the answer key is coherent.
    ///
    /// # Errors
    ///
    /// Returns `NotEnoughChoices` for fewer than two options and
    /// `ChoiceOutOfRange` if the key does not point at one of them.
    pub fn new(
        id: QuestionId,
        section: Section,
        level: CefrLevel,
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_choice: usize,
    ) -> Result<Self, PlacementError> {
        if choices.len() < 2 {
            return Err(PlacementError::NotEnoughChoices {
                provided: choices.len(),
            });
        }
        if correct_choice >= choices.len() {
            return Err(PlacementError::ChoiceOutOfRange {
                provided: correct_choice,
                available: choices.len(),
            });
        }

        Ok(Self {
            id,
            section,
            level,
            prompt: prompt.into(),
            choices,
            correct_choice,
        })
    }

    /// Grades a learner's choice.
    ///
    /// # Errors
    ///
    /// Returns `ChoiceOutOfRange` for a malformed answer index; this is the
    /// caller boundary, the session state never records such an answer.
    pub fn grade(&self, choice: usize) -> Result<bool, PlacementError> {
        if choice >= self.choices.len() {
            return Err(PlacementError::ChoiceOutOfRange {
                provided: choice,
                available: self.choices.len(),
            });
        }
        Ok(choice == self.correct_choice)
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn level(&self) -> CefrLevel {
        self.level
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// One graded answer in a placement run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredQuestion {
    pub question_id: QuestionId,
    pub section: Section,
    pub level: CefrLevel,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// A level move produced by the rolling-window adaptation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelAdjustment {
    pub from: CefrLevel,
    pub to: CefrLevel,
}

/// State machine for a single adaptive placement run.
///
/// The working level only moves through the adaptation rule, the set of
/// used question ids only grows, and once `finish` has been called the
/// session rejects any further mutation. Per-section accumulators are
/// derived from the answer history on demand rather than stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSession {
    config: PlacementConfig,
    current_level: CefrLevel,
    used_question_ids: HashSet<QuestionId>,
    history: Vec<AnsweredQuestion>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PlacementSession {
    /// Starts a new run at the given working level.
    #[must_use]
    pub fn new(
        config: PlacementConfig,
        starting_level: CefrLevel,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            current_level: starting_level,
            used_question_ids: HashSet::new(),
            history: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    #[must_use]
    pub fn current_level(&self) -> CefrLevel {
        self.current_level
    }

    #[must_use]
    pub fn questions_asked(&self) -> u32 {
        u32::try_from(self.history.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn history(&self) -> &[AnsweredQuestion] {
        &self.history
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// The section the next question should come from (fixed rotation).
    #[must_use]
    pub fn next_section(&self) -> Section {
        Section::ROTATION[self.history.len() % Section::ROTATION.len()]
    }

    /// Whether a question id has already been asked in this run.
    #[must_use]
    pub fn is_question_used(&self, id: &QuestionId) -> bool {
        self.used_question_ids.contains(id)
    }

    /// Records a graded answer and applies the adaptation rule.
    ///
    /// After every `adaptation_interval` answers, the answers within that
    /// window asked at the current level are inspected; with at least
    /// `adaptation_min_answers` of them, accuracy at or above the promote
    /// threshold moves the level up one step and accuracy below the demote
    /// threshold moves it down one, saturating at the band edges. Returns
    /// the move, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionFinished` after `finish`, and `DuplicateQuestion`
    /// if the question id was already recorded.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        section: Section,
        level: CefrLevel,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<Option<LevelAdjustment>, PlacementError> {
        if self.is_finished() {
            return Err(PlacementError::SessionFinished);
        }
        if !self.used_question_ids.insert(question_id.clone()) {
            return Err(PlacementError::DuplicateQuestion(question_id));
        }

        self.history.push(AnsweredQuestion {
            question_id,
            section,
            level,
            correct,
            answered_at,
        });

        Ok(self.maybe_adapt_level())
    }

    fn maybe_adapt_level(&mut self) -> Option<LevelAdjustment> {
        if self.history.len() % self.config.adaptation_interval != 0 {
            return None;
        }

        let window_start = self.history.len() - self.config.adaptation_interval;
        let at_level: Vec<&AnsweredQuestion> = self.history[window_start..]
            .iter()
            .filter(|a| a.level == self.current_level)
            .collect();

        // Too few answers at the current level: a single stray question
        // must not swing the level.
        if at_level.len() < self.config.adaptation_min_answers {
            return None;
        }

        let correct = at_level.iter().filter(|a| a.correct).count();
        #[allow(clippy::cast_precision_loss)]
        let accuracy = correct as f64 / at_level.len() as f64;

        let from = self.current_level;
        let to = if accuracy >= self.config.promote_threshold {
            from.up()
        } else if accuracy < self.config.demote_threshold {
            from.down()
        } else {
            from
        };

        if to == from {
            return None;
        }
        self.current_level = to;
        Some(LevelAdjustment { from, to })
    }

    /// True when the working level has not moved across the most recent
    /// `stability_window` answers.
    #[must_use]
    pub fn level_is_stable(&self) -> bool {
        let window = self.config.stability_window;
        if self.history.len() < window {
            return false;
        }
        self.history[self.history.len() - window..]
            .iter()
            .all(|a| a.level == self.current_level)
    }

    /// Whether the run should end now.
    ///
    /// Either the hard cap is reached, or the minimum length is reached
    /// with a stable level.
    #[must_use]
    pub fn should_finish(&self) -> bool {
        let asked = self.questions_asked();
        asked >= self.config.max_questions
            || (asked >= self.config.min_questions && self.level_is_stable())
    }

    /// Ends the run and computes the final placement.
    ///
    /// # Errors
    ///
    /// Returns `SessionFinished` if called twice.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<PlacementOutcome, PlacementError> {
        if self.is_finished() {
            return Err(PlacementError::SessionFinished);
        }
        self.finished_at = Some(now);

        let grammar = self.section_level(Section::Grammar);
        let vocabulary = self.section_level(Section::Vocabulary);
        let reading = self.section_level(Section::Reading);
        let listening = self.section_level(Section::Listening);
        let overall = Self::overall_level([grammar, vocabulary, reading, listening]);

        Ok(PlacementOutcome {
            grammar,
            vocabulary,
            reading,
            listening,
            overall,
            finished_at: now,
        })
    }

    /// Attempt/correct counts for a (section, level) pair, derived from
    /// the history.
    #[must_use]
    pub fn section_attempts(&self, section: Section, level: CefrLevel) -> (u32, u32) {
        let mut attempts = 0_u32;
        let mut correct = 0_u32;
        for answer in &self.history {
            if answer.section == section && answer.level == level {
                attempts += 1;
                if answer.correct {
                    correct += 1;
                }
            }
        }
        (attempts, correct)
    }

    /// Highest level at which the section reached the pass threshold with
    /// enough attempts; bottoms out at A1.
    fn section_level(&self, section: Section) -> CefrLevel {
        for level in CefrLevel::ORDER.iter().rev() {
            let (attempts, correct) = self.section_attempts(section, *level);
            if attempts < self.config.section_min_attempts {
                continue;
            }
            let accuracy = f64::from(correct) / f64::from(attempts);
            if accuracy >= self.config.section_pass_threshold {
                return *level;
            }
        }
        CefrLevel::A1
    }

    /// Most frequent section level, ties broken toward the lower band; a
    /// weakest section two or more bands below pulls the overall down one.
    fn overall_level(section_levels: [CefrLevel; 4]) -> CefrLevel {
        let mut best = CefrLevel::A1;
        let mut best_count = 0_usize;
        for candidate in CefrLevel::ORDER {
            let count = section_levels.iter().filter(|l| **l == candidate).count();
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }

        let weakest = section_levels
            .iter()
            .copied()
            .min()
            .unwrap_or(CefrLevel::A1);
        if best.index().saturating_sub(weakest.index()) >= 2 {
            best = best.down();
        }
        best
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Final placement of a finished run: one level per skill plus overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOutcome {
    pub grammar: CefrLevel,
    pub vocabulary: CefrLevel,
    pub reading: CefrLevel,
    pub listening: CefrLevel,
    pub overall: CefrLevel,
    pub finished_at: DateTime<Utc>,
}

impl PlacementOutcome {
    #[must_use]
    pub fn section(&self, section: Section) -> CefrLevel {
        match section {
            Section::Grammar => self.grammar,
            Section::Vocabulary => self.vocabulary,
            Section::Reading => self.reading,
            Section::Listening => self.listening,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
