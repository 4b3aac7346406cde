use chrono::{DateTime, Utc};

use lingua_core::{
    model::{AnswerRecord, Quality, ReviewCard},
    scheduler::Scheduler,
    time::Clock,
};
use storage::repository::CardRepository;

use crate::error::ReviewServiceError;

//
// ─── REVIEW RESULT ─────────────────────────────────────────────────────────────
//

/// Result of processing one graded answer: the outcome record for the
/// session log, with the card already advanced in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub record: AnswerRecord,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a learner's rating to a card via the scheduler.
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Create a review service with the default scheduler and a real-time
    /// clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
        }
    }

    /// Create a review service with a custom scheduler (still uses the
    /// default clock).
    #[must_use]
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            clock: Clock::default(),
            scheduler,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply a rating to an in-memory card, advancing its scheduling state.
    #[must_use]
    pub fn review_card(
        &self,
        card: &mut ReviewCard,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> ReviewResult {
        self.scheduler.advance(card, quality, reviewed_at);
        ReviewResult {
            record: AnswerRecord::new(card.word(), card.mode(), quality, reviewed_at),
        }
    }

    /// Apply a rating to a card and persist the update.
    ///
    /// If persistence fails, the in-memory card is rolled back to its
    /// original state, so an answer is never half-applied: either the card
    /// advances and is stored, or neither happens.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Storage` if persistence fails.
    pub async fn review_card_persisted(
        &self,
        card: &mut ReviewCard,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
        cards: &dyn CardRepository,
    ) -> Result<ReviewResult, ReviewServiceError> {
        let original = card.clone();

        let result = self.review_card(card, quality, reviewed_at);

        match cards.upsert_card(card).await {
            Ok(()) => Ok(result),
            Err(err) => {
                *card = original;
                Err(err.into())
            }
        }
    }
}

impl Default for ReviewService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use lingua_core::model::{CardStatus, SpellingTracker, StudyMode};
    use lingua_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn build_card() -> ReviewCard {
        ReviewCard::new("gehen", StudyMode::Receptive, fixed_now()).unwrap()
    }

    #[test]
    fn review_new_card_advances_state_and_records_answer() {
        let mut card = build_card();
        let fixed = fixed_now();
        let service = ReviewService::new().with_clock(Clock::fixed(fixed));

        let reviewed_at = service.now();
        let result = service.review_card(&mut card, Quality::Good, reviewed_at);

        assert_eq!(result.record.word, "gehen");
        assert_eq!(result.record.quality, Quality::Good);
        assert_eq!(card.status(), CardStatus::Learning);
        assert_eq!(card.last_review_at(), Some(fixed));
        assert!(card.next_review_at() > fixed);
    }

    #[tokio::test]
    async fn review_card_persisted_stores_updated_card() {
        let repo = InMemoryRepository::new();
        let mut card = build_card();
        repo.upsert_card(&card).await.unwrap();

        let service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));
        service
            .review_card_persisted(&mut card, Quality::Easy, service.now(), &repo)
            .await
            .unwrap();

        let stored = repo.get_card("gehen", StudyMode::Receptive).await.unwrap();
        assert_eq!(stored.status(), CardStatus::Review);
        assert_eq!(stored.interval_days(), 4);
        assert_eq!(stored, card);
    }

    /// Repository double whose writes always fail.
    struct FailingCards;

    #[async_trait]
    impl storage::repository::CardRepository for FailingCards {
        async fn upsert_card(&self, _card: &ReviewCard) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk unplugged".into()))
        }

        async fn get_card(
            &self,
            _word: &str,
            _mode: StudyMode,
        ) -> Result<ReviewCard, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn due_cards(
            &self,
            _mode: StudyMode,
            _now: chrono::DateTime<Utc>,
            _limit: u32,
        ) -> Result<Vec<ReviewCard>, StorageError> {
            Ok(Vec::new())
        }

        async fn new_cards(
            &self,
            _mode: StudyMode,
            _limit: u32,
        ) -> Result<Vec<ReviewCard>, StorageError> {
            Ok(Vec::new())
        }

        async fn get_spelling(&self, _word: &str) -> Result<SpellingTracker, StorageError> {
            Ok(SpellingTracker::new())
        }

        async fn save_spelling(
            &self,
            _word: &str,
            _tracker: &SpellingTracker,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk unplugged".into()))
        }
    }

    #[tokio::test]
    async fn persistence_failure_rolls_the_card_back() {
        let mut card = build_card();
        let before = card.clone();
        let service = ReviewService::new().with_clock(Clock::fixed(fixed_now()));

        let err = service
            .review_card_persisted(&mut card, Quality::Good, service.now(), &FailingCards)
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewServiceError::Storage(_)));
        assert_eq!(card, before);
    }
}
