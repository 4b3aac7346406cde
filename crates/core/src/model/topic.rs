use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::TopicId;

/// Latest practice score required to complete the practice phase.
pub const PRACTICE_PASS_THRESHOLD: f64 = 0.7;
/// Input-flood readings required to satisfy that phase.
pub const INPUT_FLOOD_TARGET: u32 = 5;
/// Review accuracy required for a completed topic to count as acquired.
pub const ACQUISITION_ACCURACY: f64 = 0.8;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("phase {attempted} is not the active phase (currently {current})")]
    PhaseNotActive {
        attempted: TopicPhase,
        current: TopicPhase,
    },

    #[error("score must be within [0, 1], got {provided}")]
    InvalidScore { provided: f64 },

    #[error("accuracy must be within [0, 1], got {provided}")]
    InvalidAccuracy { provided: f64 },

    #[error("production submission cannot be empty")]
    EmptySubmission,

    #[error("unknown topic phase: {0}")]
    UnknownPhase(String),
}

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

/// One step of the acquisition sequence for a grammar topic.
///
/// The sequence is fixed; a learner moves through it strictly in
/// [`TopicPhase::ORDER`]. `Review` is terminal: once reached, the topic
/// stays there and only its accuracy record changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicPhase {
    /// First exposure: examples of the structure in context.
    Discover,
    /// Explicit explanation of the rule.
    Understand,
    /// Guided noticing of the structure in input.
    Notice,
    /// Scored exercises; passing requires [`PRACTICE_PASS_THRESHOLD`].
    Practice,
    /// Free production; any submission counts.
    Produce,
    /// Repeated reading exposure, [`INPUT_FLOOD_TARGET`] times.
    InputFlood,
    /// Terminal spaced-review phase.
    Review,
}

impl TopicPhase {
    /// The fixed acquisition order.
    pub const ORDER: [TopicPhase; 7] = [
        TopicPhase::Discover,
        TopicPhase::Understand,
        TopicPhase::Notice,
        TopicPhase::Practice,
        TopicPhase::Produce,
        TopicPhase::InputFlood,
        TopicPhase::Review,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicPhase::Discover => "discover",
            TopicPhase::Understand => "understand",
            TopicPhase::Notice => "notice",
            TopicPhase::Practice => "practice",
            TopicPhase::Produce => "produce",
            TopicPhase::InputFlood => "input_flood",
            TopicPhase::Review => "review",
        }
    }
}

impl fmt::Display for TopicPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicPhase {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discover" => Ok(TopicPhase::Discover),
            "understand" => Ok(TopicPhase::Understand),
            "notice" => Ok(TopicPhase::Notice),
            "practice" => Ok(TopicPhase::Practice),
            "produce" => Ok(TopicPhase::Produce),
            "input_flood" => Ok(TopicPhase::InputFlood),
            "review" => Ok(TopicPhase::Review),
            other => Err(TopicError::UnknownPhase(other.to_owned())),
        }
    }
}

//
// ─── PHASE RECORDS ─────────────────────────────────────────────────────────────
//

/// Scored-exercise record for the practice phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PracticeRecord {
    pub completed: bool,
    pub last_score: Option<f64>,
    pub attempts: u32,
}

/// One free-production submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceSubmission {
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

/// Spaced-review record for the terminal phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub accuracy: f64,
    pub last_review_at: DateTime<Utc>,
}

/// Data accompanying a phase completion.
///
/// Carries exactly the payload each phase needs, so a caller cannot, say,
/// complete practice without a score.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseCompletion {
    Discover,
    Understand,
    Notice,
    Practice { score: f64 },
    Produce { text: String },
    InputFlood,
    Review { accuracy: f64 },
}

impl PhaseCompletion {
    /// The phase this completion targets.
    #[must_use]
    pub fn phase(&self) -> TopicPhase {
        match self {
            PhaseCompletion::Discover => TopicPhase::Discover,
            PhaseCompletion::Understand => TopicPhase::Understand,
            PhaseCompletion::Notice => TopicPhase::Notice,
            PhaseCompletion::Practice { .. } => TopicPhase::Practice,
            PhaseCompletion::Produce { .. } => TopicPhase::Produce,
            PhaseCompletion::InputFlood => TopicPhase::InputFlood,
            PhaseCompletion::Review { .. } => TopicPhase::Review,
        }
    }
}

//
// ─── TOPIC PROGRESS ────────────────────────────────────────────────────────────
//

/// One learner's progress through a single grammar topic.
///
/// The current phase is never stored: it is re-derived from the recorded
/// completions on every call, so a resumed topic always continues exactly
/// where the records say it should. Records only move forward; there is no
/// skip-ahead mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgress {
    topic_id: TopicId,
    discover_done: bool,
    understand_done: bool,
    notice_done: bool,
    practice: PracticeRecord,
    produce_submissions: Vec<ProduceSubmission>,
    input_flood_reads: u32,
    review: Option<ReviewRecord>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TopicProgress {
    /// Starts a fresh progress record for a topic.
    #[must_use]
    pub fn start(topic_id: TopicId, started_at: DateTime<Utc>) -> Self {
        Self {
            topic_id,
            discover_done: false,
            understand_done: false,
            notice_done: false,
            practice: PracticeRecord::default(),
            produce_submissions: Vec::new(),
            input_flood_reads: 0,
            review: None,
            started_at,
            completed_at: None,
        }
    }

    /// Rehydrates a progress record from storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        topic_id: TopicId,
        discover_done: bool,
        understand_done: bool,
        notice_done: bool,
        practice: PracticeRecord,
        produce_submissions: Vec<ProduceSubmission>,
        input_flood_reads: u32,
        review: Option<ReviewRecord>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            topic_id,
            discover_done,
            understand_done,
            notice_done,
            practice,
            produce_submissions,
            input_flood_reads,
            review,
            started_at,
            completed_at,
        }
    }

    /// Derives the active phase by scanning completions in fixed order.
    ///
    /// Pure derivation: calling this any number of times without a
    /// `complete_phase` in between yields the same answer.
    #[must_use]
    pub fn current_phase(&self) -> TopicPhase {
        if !self.discover_done {
            TopicPhase::Discover
        } else if !self.understand_done {
            TopicPhase::Understand
        } else if !self.notice_done {
            TopicPhase::Notice
        } else if !self.practice.completed {
            TopicPhase::Practice
        } else if self.produce_submissions.is_empty() {
            TopicPhase::Produce
        } else if self.input_flood_reads < INPUT_FLOOD_TARGET {
            TopicPhase::InputFlood
        } else {
            TopicPhase::Review
        }
    }

    /// Applies a phase completion and returns the newly derived phase.
    ///
    /// Only the currently active phase accepts a completion; attempts
    /// against any other phase are rejected so the record can never get
    /// ahead of itself. A failing practice submission still counts an
    /// attempt. Review accuracy may be re-recorded any number of times
    /// once the terminal phase is reached.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::PhaseNotActive` when the completion targets a
    /// phase other than the derived current one, and validation errors for
    /// out-of-range scores or empty submissions.
    pub fn complete_phase(
        &mut self,
        completion: PhaseCompletion,
        now: DateTime<Utc>,
    ) -> Result<TopicPhase, TopicError> {
        let current = self.current_phase();
        let attempted = completion.phase();
        if attempted != current {
            return Err(TopicError::PhaseNotActive { attempted, current });
        }

        match completion {
            PhaseCompletion::Discover => self.discover_done = true,
            PhaseCompletion::Understand => self.understand_done = true,
            PhaseCompletion::Notice => self.notice_done = true,
            PhaseCompletion::Practice { score } => {
                if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                    return Err(TopicError::InvalidScore { provided: score });
                }
                self.practice.attempts += 1;
                self.practice.last_score = Some(score);
                if score >= PRACTICE_PASS_THRESHOLD {
                    self.practice.completed = true;
                }
            }
            PhaseCompletion::Produce { text } => {
                if text.trim().is_empty() {
                    return Err(TopicError::EmptySubmission);
                }
                self.produce_submissions.push(ProduceSubmission {
                    text,
                    submitted_at: now,
                });
            }
            PhaseCompletion::InputFlood => {
                self.input_flood_reads += 1;
            }
            PhaseCompletion::Review { accuracy } => {
                if !accuracy.is_finite() || !(0.0..=1.0).contains(&accuracy) {
                    return Err(TopicError::InvalidAccuracy { provided: accuracy });
                }
                self.review = Some(ReviewRecord {
                    accuracy,
                    last_review_at: now,
                });
            }
        }

        if self.is_completed() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }

        Ok(self.current_phase())
    }

    /// True when every non-review phase is satisfied.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.current_phase() == TopicPhase::Review
    }

    /// True when the topic is completed and its recorded review accuracy
    /// has reached [`ACQUISITION_ACCURACY`].
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.is_completed()
            && self
                .review
                .as_ref()
                .is_some_and(|r| r.accuracy >= ACQUISITION_ACCURACY)
    }

    // Accessors
    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn discover_done(&self) -> bool {
        self.discover_done
    }

    #[must_use]
    pub fn understand_done(&self) -> bool {
        self.understand_done
    }

    #[must_use]
    pub fn notice_done(&self) -> bool {
        self.notice_done
    }

    #[must_use]
    pub fn practice(&self) -> &PracticeRecord {
        &self.practice
    }

    #[must_use]
    pub fn produce_submissions(&self) -> &[ProduceSubmission] {
        &self.produce_submissions
    }

    #[must_use]
    pub fn input_flood_reads(&self) -> u32 {
        self.input_flood_reads
    }

    #[must_use]
    pub fn review(&self) -> Option<&ReviewRecord> {
        self.review.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
