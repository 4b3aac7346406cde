use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lower bound for a card's ease factor.
pub const MIN_EASE: f64 = 1.3;
/// Upper bound for a card's ease factor.
pub const MAX_EASE: f64 = 3.0;
/// Ease factor assigned to a freshly created card.
pub const DEFAULT_EASE: f64 = 2.5;
/// Review interval (in days) at which a card counts as learned.
pub const LEARNED_THRESHOLD_DAYS: u32 = 21;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("word cannot be empty")]
    EmptyWord,

    #[error("ease factor {provided} outside [{MIN_EASE}, {MAX_EASE}]")]
    EaseOutOfBounds { provided: f64 },

    #[error("invalid persisted card state: {0}")]
    InvalidPersistedState(String),

    #[error("unknown card status: {0}")]
    UnknownStatus(String),

    #[error("unknown study mode: {0}")]
    UnknownMode(String),
}

//
// ─── STUDY MODE ────────────────────────────────────────────────────────────────
//

/// Direction in which a vocabulary item is practiced.
///
/// Each word carries one scheduling record per mode, so recognising a word
/// and producing it are tracked (and fall due) independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyMode {
    /// Target language shown, learner recalls the meaning.
    Receptive,
    /// Meaning shown, learner produces the target-language word.
    Productive,
}

impl StudyMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Receptive => "receptive",
            StudyMode::Productive => "productive",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receptive" => Ok(StudyMode::Receptive),
            "productive" => Ok(StudyMode::Productive),
            other => Err(CardError::UnknownMode(other.to_owned())),
        }
    }
}

//
// ─── CARD STATUS ───────────────────────────────────────────────────────────────
//

/// Scheduling lifecycle state of a review card.
///
/// A card is in exactly one state at a time; the scheduler is the only
/// place that moves cards between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    /// Never answered; waits in the new queue.
    New,
    /// Working through the short-interval learning ladder.
    Learning,
    /// Graduated to day-scale SM-2 intervals.
    Review,
    /// In review with an interval of at least [`LEARNED_THRESHOLD_DAYS`].
    Learned,
}

impl CardStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::New => "new",
            CardStatus::Learning => "learning",
            CardStatus::Review => "review",
            CardStatus::Learned => "learned",
        }
    }
}

impl FromStr for CardStatus {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CardStatus::New),
            "learning" => Ok(CardStatus::Learning),
            "review" => Ok(CardStatus::Review),
            "learned" => Ok(CardStatus::Learned),
            other => Err(CardError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── REVIEW CARD ───────────────────────────────────────────────────────────────
//

/// One vocabulary item's scheduling record for a single study mode.
///
/// Created in `New` status when a word enters the learner's vocabulary and
/// mutated only by the scheduler in response to a graded answer. The word
/// itself carries two of these, one per [`StudyMode`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCard {
    pub(crate) word: String,
    pub(crate) mode: StudyMode,
    pub(crate) status: CardStatus,
    pub(crate) ease_factor: f64,
    pub(crate) interval_days: u32,
    pub(crate) repetitions: u32,
    pub(crate) lapses: u32,
    pub(crate) learning_step: usize,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) next_review_at: DateTime<Utc>,
    pub(crate) last_review_at: Option<DateTime<Utc>>,
}

impl ReviewCard {
    /// Creates a brand-new card for a word in the given mode.
    ///
    /// The card starts in `New` status and is immediately available to
    /// session building (`next_review_at == created_at`).
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyWord` if the word is blank.
    pub fn new(
        word: impl Into<String>,
        mode: StudyMode,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(CardError::EmptyWord);
        }

        Ok(Self {
            word: word.trim().to_owned(),
            mode,
            status: CardStatus::New,
            ease_factor: DEFAULT_EASE,
            interval_days: 0,
            repetitions: 0,
            lapses: 0,
            learning_step: 0,
            created_at,
            next_review_at: created_at,
            last_review_at: None,
        })
    }

    /// Rehydrates a card from persisted storage, re-checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EaseOutOfBounds` if the stored ease factor is
    /// outside bounds, and `CardError::InvalidPersistedState` if the status
    /// contradicts the interval (a `Learned` card below the learned
    /// threshold, or a `New`/`Learning` card with a nonzero interval).
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        word: impl Into<String>,
        mode: StudyMode,
        status: CardStatus,
        ease_factor: f64,
        interval_days: u32,
        repetitions: u32,
        lapses: u32,
        learning_step: usize,
        created_at: DateTime<Utc>,
        next_review_at: DateTime<Utc>,
        last_review_at: Option<DateTime<Utc>>,
    ) -> Result<Self, CardError> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(CardError::EmptyWord);
        }
        if !ease_factor.is_finite() || !(MIN_EASE..=MAX_EASE).contains(&ease_factor) {
            return Err(CardError::EaseOutOfBounds {
                provided: ease_factor,
            });
        }
        match status {
            CardStatus::Learned if interval_days < LEARNED_THRESHOLD_DAYS => {
                return Err(CardError::InvalidPersistedState(format!(
                    "learned card with interval {interval_days} days"
                )));
            }
            CardStatus::Review if interval_days >= LEARNED_THRESHOLD_DAYS => {
                return Err(CardError::InvalidPersistedState(format!(
                    "review card at interval {interval_days} days should be learned"
                )));
            }
            CardStatus::New | CardStatus::Learning if interval_days != 0 => {
                return Err(CardError::InvalidPersistedState(format!(
                    "{} card with nonzero interval {interval_days}",
                    status.as_str()
                )));
            }
            CardStatus::New if last_review_at.is_some() => {
                return Err(CardError::InvalidPersistedState(
                    "new card with a recorded review".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            word,
            mode,
            status,
            ease_factor,
            interval_days,
            repetitions,
            lapses,
            learning_step,
            created_at,
            next_review_at,
            last_review_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn status(&self) -> CardStatus {
        self.status
    }

    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    #[must_use]
    pub fn lapses(&self) -> u32 {
        self.lapses
    }

    #[must_use]
    pub fn learning_step(&self) -> usize {
        self.learning_step
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn next_review_at(&self) -> DateTime<Utc> {
        self.next_review_at
    }

    #[must_use]
    pub fn last_review_at(&self) -> Option<DateTime<Utc>> {
        self.last_review_at
    }

    /// True while the card has never been answered.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status == CardStatus::New
    }

    /// True when a previously answered card has come due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != CardStatus::New && self.next_review_at <= now
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
