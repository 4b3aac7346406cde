use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{
    CardStatus, DEFAULT_EASE, LEARNED_THRESHOLD_DAYS, MAX_EASE, MIN_EASE, Quality, ReviewCard,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("learning ladder must have at least one step")]
    EmptyLearningLadder,

    #[error("ease bounds invalid: min {min}, start {start}, max {max}")]
    InvalidEaseBounds { min: f64, start: f64, max: f64 },

    #[error("{name} must be positive")]
    NonPositiveParameter { name: &'static str },

    #[error("interval multiplier {provided} must be at least 1")]
    InvalidMultiplier { provided: f64 },
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Tuning parameters for the card scheduler.
///
/// Defaults match the product behavior: a two-step learning ladder of
/// 1 and 10 minutes, graduation to a 1-day interval (4 days on an easy
/// graduation), and the classic SM-2 ease bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    learning_step_minutes: Vec<u32>,
    graduating_interval_days: u32,
    easy_interval_days: u32,
    min_ease: f64,
    max_ease: f64,
    starting_ease: f64,
    hard_interval_multiplier: f64,
    easy_interval_bonus: f64,
    lapse_ease_penalty: f64,
    easy_graduation_ease_bonus: f64,
    learned_threshold_days: u32,
    max_interval_days: u32,
}

impl SchedulerConfig {
    /// Creates custom scheduler parameters.
    ///
    /// # Errors
    ///
    /// Returns a `SchedulerError` for an empty ladder, inconsistent ease
    /// bounds, or degenerate multipliers.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        learning_step_minutes: Vec<u32>,
        graduating_interval_days: u32,
        easy_interval_days: u32,
        min_ease: f64,
        max_ease: f64,
        starting_ease: f64,
        hard_interval_multiplier: f64,
        easy_interval_bonus: f64,
        lapse_ease_penalty: f64,
        easy_graduation_ease_bonus: f64,
        learned_threshold_days: u32,
        max_interval_days: u32,
    ) -> Result<Self, SchedulerError> {
        if learning_step_minutes.is_empty() {
            return Err(SchedulerError::EmptyLearningLadder);
        }
        if !(min_ease <= starting_ease && starting_ease <= max_ease) || min_ease <= 0.0 {
            return Err(SchedulerError::InvalidEaseBounds {
                min: min_ease,
                start: starting_ease,
                max: max_ease,
            });
        }
        if graduating_interval_days == 0 {
            return Err(SchedulerError::NonPositiveParameter {
                name: "graduating interval",
            });
        }
        if easy_interval_days == 0 {
            return Err(SchedulerError::NonPositiveParameter {
                name: "easy interval",
            });
        }
        if learned_threshold_days == 0 {
            return Err(SchedulerError::NonPositiveParameter {
                name: "learned threshold",
            });
        }
        if lapse_ease_penalty <= 0.0 {
            return Err(SchedulerError::NonPositiveParameter {
                name: "lapse ease penalty",
            });
        }
        if easy_graduation_ease_bonus <= 0.0 {
            return Err(SchedulerError::NonPositiveParameter {
                name: "easy graduation ease bonus",
            });
        }
        for multiplier in [hard_interval_multiplier, easy_interval_bonus] {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(SchedulerError::InvalidMultiplier {
                    provided: multiplier,
                });
            }
        }
        if max_interval_days < learned_threshold_days.max(easy_interval_days) {
            return Err(SchedulerError::NonPositiveParameter {
                name: "maximum interval",
            });
        }

        Ok(Self {
            learning_step_minutes,
            graduating_interval_days,
            easy_interval_days,
            min_ease,
            max_ease,
            starting_ease,
            hard_interval_multiplier,
            easy_interval_bonus,
            lapse_ease_penalty,
            easy_graduation_ease_bonus,
            learned_threshold_days,
            max_interval_days,
        })
    }

    #[must_use]
    pub fn learning_step_minutes(&self) -> &[u32] {
        &self.learning_step_minutes
    }

    #[must_use]
    pub fn graduating_interval_days(&self) -> u32 {
        self.graduating_interval_days
    }

    #[must_use]
    pub fn easy_interval_days(&self) -> u32 {
        self.easy_interval_days
    }

    #[must_use]
    pub fn learned_threshold_days(&self) -> u32 {
        self.learned_threshold_days
    }

    /// Ease assigned at card creation; validated against the bounds here.
    #[must_use]
    pub fn starting_ease(&self) -> f64 {
        self.starting_ease
    }

    #[must_use]
    pub fn max_interval_days(&self) -> u32 {
        self.max_interval_days
    }

    fn step(&self, index: usize) -> Duration {
        let clamped = index.min(self.learning_step_minutes.len() - 1);
        Duration::minutes(i64::from(self.learning_step_minutes[clamped]))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_step_minutes: vec![1, 10],
            graduating_interval_days: 1,
            easy_interval_days: 4,
            min_ease: MIN_EASE,
            max_ease: MAX_EASE,
            starting_ease: DEFAULT_EASE,
            hard_interval_multiplier: 1.2,
            easy_interval_bonus: 1.3,
            lapse_ease_penalty: 0.2,
            easy_graduation_ease_bonus: 0.15,
            learned_threshold_days: LEARNED_THRESHOLD_DAYS,
            max_interval_days: 365,
        }
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 variant scheduler with a short-interval learning ladder.
///
/// New and lapsed cards walk the ladder in minutes; graduated cards move
/// to day-scale intervals grown by the classic SM-2 ease formula. The
/// whole transition is a pure function of the card, the rating, and the
/// clock reading: no I/O, no hidden state.
///
/// # Examples
///
/// ```
/// # use lingua_core::scheduler::Scheduler;
/// # use lingua_core::model::{Quality, ReviewCard, StudyMode};
/// let scheduler = Scheduler::new();
/// let now = chrono::Utc::now();
/// let mut card = ReviewCard::new("gehen", StudyMode::Receptive, now).unwrap();
///
/// scheduler.advance(&mut card, Quality::Good, now);
/// assert_eq!(card.last_review_at(), Some(now));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler with the default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler with custom parameters.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Advances a card's scheduling state for one graded answer.
    ///
    /// Total and deterministic: every (status, quality) pair has a defined
    /// transition, and `last_review_at` is stamped on every branch.
    pub fn advance(&self, card: &mut ReviewCard, quality: Quality, now: DateTime<Utc>) {
        match card.status {
            CardStatus::New | CardStatus::Learning => {
                self.advance_learning(card, quality, now);
            }
            CardStatus::Review | CardStatus::Learned => {
                self.advance_review(card, quality, now);
            }
        }
        card.last_review_at = Some(now);
    }

    /// Learning-phase branch: walk the short-interval ladder.
    fn advance_learning(&self, card: &mut ReviewCard, quality: Quality, now: DateTime<Utc>) {
        match quality {
            Quality::Again => {
                card.status = CardStatus::Learning;
                card.learning_step = 0;
                card.next_review_at = now + self.config.step(0);
            }
            Quality::Hard => {
                // Stay on the current step.
                card.status = CardStatus::Learning;
                card.next_review_at = now + self.config.step(card.learning_step);
            }
            Quality::Good => {
                let next_step = card.learning_step + 1;
                if next_step >= self.config.learning_step_minutes.len() {
                    self.graduate(card, self.config.graduating_interval_days, now);
                } else {
                    card.status = CardStatus::Learning;
                    card.learning_step = next_step;
                    card.next_review_at = now + self.config.step(next_step);
                }
            }
            Quality::Easy => {
                // An easy answer skips the rest of the ladder entirely.
                card.ease_factor = (card.ease_factor + self.config.easy_graduation_ease_bonus)
                    .min(self.config.max_ease);
                self.graduate(card, self.config.easy_interval_days, now);
            }
        }
    }

    fn graduate(&self, card: &mut ReviewCard, interval_days: u32, now: DateTime<Utc>) {
        card.status = CardStatus::Review;
        card.learning_step = 0;
        card.interval_days = interval_days;
        card.next_review_at = now + Duration::days(i64::from(interval_days));
    }

    /// Review-phase branch: classic SM-2 with a four-grade front end.
    fn advance_review(&self, card: &mut ReviewCard, quality: Quality, now: DateTime<Utc>) {
        if quality == Quality::Again {
            // Lapse: back onto the ladder. Interval progress is lost but
            // the repetition history is kept; only `lapses` accumulates.
            card.lapses += 1;
            card.status = CardStatus::Learning;
            card.learning_step = 0;
            card.interval_days = 0;
            card.ease_factor = (card.ease_factor - self.config.lapse_ease_penalty)
                .max(self.config.min_ease);
            card.next_review_at = now + self.config.step(0);
            return;
        }

        card.repetitions += 1;

        let q = f64::from(quality.to_sm2_quality());
        card.ease_factor += 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
        card.ease_factor = card.ease_factor.clamp(self.config.min_ease, self.config.max_ease);

        let previous = f64::from(card.interval_days);
        let grown = match quality {
            Quality::Hard => previous * self.config.hard_interval_multiplier,
            Quality::Good => previous * card.ease_factor,
            Quality::Easy => previous * card.ease_factor * self.config.easy_interval_bonus,
            Quality::Again => unreachable!("lapse handled above"),
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let interval = grown
            .round()
            .clamp(1.0, f64::from(self.config.max_interval_days)) as u32;
        card.interval_days = interval;
        card.next_review_at = now + Duration::days(i64::from(interval));
        card.status = if interval >= self.config.learned_threshold_days {
            CardStatus::Learned
        } else {
            CardStatus::Review
        };
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudyMode;
    use crate::time::fixed_now;

    fn new_card() -> ReviewCard {
        ReviewCard::new("gehen", StudyMode::Receptive, fixed_now()).unwrap()
    }

    fn review_card(interval_days: u32, ease: f64) -> ReviewCard {
        ReviewCard::from_persisted(
            "gehen",
            StudyMode::Receptive,
            if interval_days >= LEARNED_THRESHOLD_DAYS {
                CardStatus::Learned
            } else {
                CardStatus::Review
            },
            ease,
            interval_days,
            3,
            0,
            0,
            fixed_now() - chrono::Duration::days(60),
            fixed_now(),
            Some(fixed_now() - chrono::Duration::days(i64::from(interval_days))),
        )
        .unwrap()
    }

    #[test]
    fn again_resets_to_first_ladder_step() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Good, now);
        assert_eq!(card.learning_step(), 1);

        scheduler.advance(&mut card, Quality::Again, now);
        assert_eq!(card.status(), CardStatus::Learning);
        assert_eq!(card.learning_step(), 0);
        assert_eq!(card.next_review_at(), now + Duration::minutes(1));
    }

    #[test]
    fn hard_repeats_current_ladder_step() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Good, now);
        scheduler.advance(&mut card, Quality::Hard, now);
        assert_eq!(card.learning_step(), 1);
        assert_eq!(card.next_review_at(), now + Duration::minutes(10));
    }

    #[test]
    fn good_through_ladder_graduates_with_one_day() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Good, now);
        assert_eq!(card.status(), CardStatus::Learning);
        assert_eq!(card.interval_days(), 0);

        scheduler.advance(&mut card, Quality::Good, now);
        assert_eq!(card.status(), CardStatus::Review);
        assert_eq!(card.interval_days(), 1);
        assert_eq!(card.next_review_at(), now + Duration::days(1));
    }

    #[test]
    fn easy_on_new_card_skips_learning_entirely() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Easy, now);
        assert_eq!(card.status(), CardStatus::Review);
        assert_eq!(card.interval_days(), 4);
        assert!((card.ease_factor() - 2.65).abs() < 1e-9);
        assert_eq!(card.next_review_at(), now + Duration::days(4));
    }

    #[test]
    fn graduation_interval_is_one_or_four_days() {
        let scheduler = Scheduler::new();
        let now = fixed_now();

        let mut good_path = new_card();
        scheduler.advance(&mut good_path, Quality::Good, now);
        scheduler.advance(&mut good_path, Quality::Good, now);
        assert_eq!(good_path.status(), CardStatus::Review);
        assert_eq!(good_path.interval_days(), 1);

        let mut easy_path = new_card();
        scheduler.advance(&mut easy_path, Quality::Easy, now);
        assert_eq!(easy_path.status(), CardStatus::Review);
        assert_eq!(easy_path.interval_days(), 4);
    }

    #[test]
    fn review_good_grows_interval_by_ease() {
        let scheduler = Scheduler::new();
        let mut card = review_card(10, 2.5);
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Good, now);
        // Good leaves the ease factor unchanged and multiplies by it.
        assert!((card.ease_factor() - 2.5).abs() < 1e-9);
        assert_eq!(card.interval_days(), 25);
        assert_eq!(card.status(), CardStatus::Learned);
    }

    #[test]
    fn review_hard_uses_fixed_multiplier_and_drops_ease() {
        let scheduler = Scheduler::new();
        let mut card = review_card(10, 2.5);
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Hard, now);
        assert!((card.ease_factor() - 2.36).abs() < 1e-9);
        assert_eq!(card.interval_days(), 12);
        assert_eq!(card.status(), CardStatus::Review);
        assert_eq!(card.repetitions(), 4);
    }

    #[test]
    fn worked_example_good_good_easy() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        let now = fixed_now();

        scheduler.advance(&mut card, Quality::Good, now);
        scheduler.advance(&mut card, Quality::Good, now);
        assert_eq!(card.status(), CardStatus::Review);
        assert_eq!(card.interval_days(), 1);

        scheduler.advance(&mut card, Quality::Easy, now);
        // Easy nudges ease 2.5 -> 2.6; interval = round(1 * 2.6 * 1.3) = 3.
        assert!((card.ease_factor() - 2.6).abs() < 1e-9);
        assert_eq!(card.interval_days(), 3);
        assert_eq!(card.status(), CardStatus::Review);
    }

    #[test]
    fn lapse_increments_lapses_but_keeps_repetitions() {
        let scheduler = Scheduler::new();
        let mut card = review_card(40, 2.5);
        let now = fixed_now();
        let repetitions_before = card.repetitions();

        scheduler.advance(&mut card, Quality::Again, now);

        // Pinned behavior: interval progress resets, history does not.
        assert_eq!(card.lapses(), 1);
        assert_eq!(card.repetitions(), repetitions_before);
        assert_eq!(card.status(), CardStatus::Learning);
        assert_eq!(card.interval_days(), 0);
        assert_eq!(card.learning_step(), 0);
        assert!((card.ease_factor() - 2.3).abs() < 1e-9);
        assert_eq!(card.next_review_at(), now + Duration::minutes(1));
    }

    #[test]
    fn learned_iff_interval_at_threshold() {
        let scheduler = Scheduler::new();
        let now = fixed_now();

        // 17 * 1.2 = 20.4 -> 20 days: stays in review.
        let mut below = review_card(17, 2.5);
        scheduler.advance(&mut below, Quality::Hard, now);
        assert_eq!(below.interval_days(), 20);
        assert_eq!(below.status(), CardStatus::Review);

        // 18 * 1.2 = 21.6 -> 22 days: learned.
        let mut above = review_card(18, 2.5);
        scheduler.advance(&mut above, Quality::Hard, now);
        assert_eq!(above.interval_days(), 22);
        assert_eq!(above.status(), CardStatus::Learned);
    }

    #[test]
    fn learned_card_lapses_back_to_learning() {
        let scheduler = Scheduler::new();
        let mut card = review_card(34, 2.5);
        let now = fixed_now();
        assert_eq!(card.status(), CardStatus::Learned);

        scheduler.advance(&mut card, Quality::Again, now);
        assert_eq!(card.status(), CardStatus::Learning);
        assert_eq!(card.lapses(), 1);
    }

    #[test]
    fn ease_stays_in_bounds_for_arbitrary_sequences() {
        let scheduler = Scheduler::new();
        let now = fixed_now();

        // A deterministic but varied grind over every rating.
        let ratings = [
            Quality::Good,
            Quality::Easy,
            Quality::Again,
            Quality::Hard,
            Quality::Good,
            Quality::Good,
            Quality::Easy,
            Quality::Easy,
            Quality::Again,
            Quality::Again,
            Quality::Hard,
            Quality::Easy,
        ];

        let mut card = new_card();
        for _ in 0..20 {
            for quality in ratings {
                scheduler.advance(&mut card, quality, now);
                assert!(
                    (MIN_EASE..=MAX_EASE).contains(&card.ease_factor()),
                    "ease {} escaped bounds",
                    card.ease_factor()
                );
            }
        }
    }

    #[test]
    fn repeated_again_floors_ease_at_minimum() {
        let scheduler = Scheduler::new();
        let now = fixed_now();
        let mut card = new_card();

        // Graduate, then lapse and re-graduate over and over. Each cycle
        // ends with exactly one review-phase Again.
        scheduler.advance(&mut card, Quality::Easy, now);
        for _ in 0..12 {
            scheduler.advance(&mut card, Quality::Good, now);
            scheduler.advance(&mut card, Quality::Good, now);
            scheduler.advance(&mut card, Quality::Again, now);
        }

        assert!((card.ease_factor() - MIN_EASE).abs() < 1e-9);
        assert_eq!(card.lapses(), 12);
    }

    #[test]
    fn repeated_easy_caps_ease_at_maximum() {
        let scheduler = Scheduler::new();
        let now = fixed_now();
        let mut card = new_card();

        scheduler.advance(&mut card, Quality::Easy, now);
        for _ in 0..30 {
            scheduler.advance(&mut card, Quality::Easy, now);
        }

        assert!(card.ease_factor() <= MAX_EASE);
        assert!((card.ease_factor() - MAX_EASE).abs() < 1e-9);
    }

    #[test]
    fn last_review_stamped_on_every_branch() {
        let scheduler = Scheduler::new();
        let now = fixed_now();

        for quality in [Quality::Again, Quality::Hard, Quality::Good, Quality::Easy] {
            let mut learning = new_card();
            scheduler.advance(&mut learning, quality, now);
            assert_eq!(learning.last_review_at(), Some(now));

            let mut reviewing = review_card(5, 2.5);
            scheduler.advance(&mut reviewing, quality, now);
            assert_eq!(reviewing.last_review_at(), Some(now));
        }
    }

    #[test]
    fn config_rejects_empty_ladder() {
        let err = SchedulerConfig::new(vec![], 1, 4, 1.3, 3.0, 2.5, 1.2, 1.3, 0.2, 0.15, 21, 365)
            .unwrap_err();
        assert_eq!(err, SchedulerError::EmptyLearningLadder);
    }

    #[test]
    fn config_rejects_inverted_ease_bounds() {
        let err =
            SchedulerConfig::new(vec![1, 10], 1, 4, 2.0, 3.0, 1.5, 1.2, 1.3, 0.2, 0.15, 21, 365)
                .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidEaseBounds { .. }));
    }

    #[test]
    fn config_rejects_sub_unit_multiplier() {
        let err =
            SchedulerConfig::new(vec![1, 10], 1, 4, 1.3, 3.0, 2.5, 0.9, 1.3, 0.2, 0.15, 21, 365)
                .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidMultiplier { .. }));
    }

    #[test]
    fn config_rejects_max_interval_below_learned_threshold() {
        let err =
            SchedulerConfig::new(vec![1, 10], 1, 4, 1.3, 3.0, 2.5, 1.2, 1.3, 0.2, 0.15, 21, 10)
                .unwrap_err();
        assert!(matches!(err, SchedulerError::NonPositiveParameter { .. }));
    }
}
