use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua_core::model::{
    PlacementOutcome, ReviewCard, SessionSummary, SpellingTracker, StudyMode, TopicId,
    TopicProgress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Most recent session-log records retained per learner.
pub const SESSION_LOG_CAP: usize = 100;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── SESSION LOG ───────────────────────────────────────────────────────────────
//

/// Kind tag for an entry in the analytics session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    VocabularyReview,
    PlacementTest,
    GrammarTopic,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::VocabularyReview => "vocabulary_review",
            SessionKind::PlacementTest => "placement_test",
            SessionKind::GrammarTopic => "grammar_topic",
        }
    }

    /// Parses the storage representation back into a kind.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an unknown tag.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "vocabulary_review" => Ok(SessionKind::VocabularyReview),
            "placement_test" => Ok(SessionKind::PlacementTest),
            "grammar_topic" => Ok(SessionKind::GrammarTopic),
            other => Err(StorageError::Serialization(format!(
                "invalid session kind: {other}"
            ))),
        }
    }
}

/// One appended entry of the capped analytics log.
///
/// The engine only ever appends these; nothing in the core reads them
/// back for scheduling decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLogRecord {
    pub id: Option<i64>,
    pub kind: SessionKind,
    pub mode: Option<StudyMode>,
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
    pub duration_secs: i64,
    pub recorded_at: DateTime<Utc>,
}

impl SessionLogRecord {
    /// Builds a log entry from a finished review-session summary.
    #[must_use]
    pub fn from_summary(summary: &SessionSummary) -> Self {
        Self {
            id: None,
            kind: SessionKind::VocabularyReview,
            mode: Some(summary.mode()),
            total: summary.total_answers(),
            correct: summary.correct(),
            accuracy: summary.accuracy(),
            duration_secs: summary.duration().num_seconds(),
            recorded_at: summary.completed_at(),
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for vocabulary cards and their spelling samples.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update one card (keyed by word + mode).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &ReviewCard) -> Result<(), StorageError>;

    /// Fetch a single card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_card(&self, word: &str, mode: StudyMode) -> Result<ReviewCard, StorageError>;

    /// Cards of the mode whose `next_review_at` has passed, ordered by
    /// `next_review_at` ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn due_cards(
        &self,
        mode: StudyMode,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewCard>, StorageError>;

    /// Never-answered cards of the mode, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn new_cards(&self, mode: StudyMode, limit: u32) -> Result<Vec<ReviewCard>, StorageError>;

    /// Spelling-sample window for a word; empty tracker when none exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_spelling(&self, word: &str) -> Result<SpellingTracker, StorageError>;

    /// Persist the spelling-sample window for a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn save_spelling(&self, word: &str, tracker: &SpellingTracker)
    -> Result<(), StorageError>;
}

/// Repository contract for grammar-topic progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist or update one topic's progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &TopicProgress) -> Result<(), StorageError>;

    /// Fetch a topic's progress, `None` if the topic was never started.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_progress(&self, topic_id: &TopicId)
    -> Result<Option<TopicProgress>, StorageError>;
}

/// Repository contract for finished placement runs.
#[async_trait]
pub trait PlacementRepository: Send + Sync {
    /// Append the outcome of a finished run.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the outcome cannot be stored.
    async fn save_outcome(&self, outcome: &PlacementOutcome) -> Result<(), StorageError>;

    /// The most recently finished run's outcome, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn latest_outcome(&self) -> Result<Option<PlacementOutcome>, StorageError>;
}

/// Repository contract for the capped analytics session log.
#[async_trait]
pub trait SessionLogRepository: Send + Sync {
    /// Append one record, trimming the log to [`SESSION_LOG_CAP`] entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_log(&self, record: &SessionLogRecord) -> Result<i64, StorageError>;

    /// Most recent records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_logs(&self, limit: u32) -> Result<Vec<SessionLogRecord>, StorageError>;
}

/// Bundle of repository trait objects for wiring services.
#[derive(Clone)]
pub struct Storage {
    pub cards: Arc<dyn CardRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub placements: Arc<dyn PlacementRepository>,
    pub session_logs: Arc<dyn SessionLogRepository>,
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cards: Arc<Mutex<HashMap<(String, StudyMode), ReviewCard>>>,
    spelling: Arc<Mutex<HashMap<String, Vec<bool>>>>,
    progress: Arc<Mutex<HashMap<TopicId, TopicProgress>>>,
    placements: Arc<Mutex<Vec<PlacementOutcome>>>,
    logs: Arc<Mutex<(i64, Vec<SessionLogRecord>)>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle this adapter behind every repository trait.
    #[must_use]
    pub fn into_storage(self) -> Storage {
        Storage {
            cards: Arc::new(self.clone()),
            progress: Arc::new(self.clone()),
            placements: Arc::new(self.clone()),
            session_logs: Arc::new(self),
        }
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &ReviewCard) -> Result<(), StorageError> {
        let mut guard = self.cards.lock().map_err(lock_err)?;
        guard.insert((card.word().to_owned(), card.mode()), card.clone());
        Ok(())
    }

    async fn get_card(&self, word: &str, mode: StudyMode) -> Result<ReviewCard, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        guard
            .get(&(word.to_owned(), mode))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn due_cards(
        &self,
        mode: StudyMode,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewCard>, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        let mut due: Vec<ReviewCard> = guard
            .values()
            .filter(|card| card.mode() == mode && card.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.next_review_at()
                .cmp(&b.next_review_at())
                .then_with(|| a.word().cmp(b.word()))
        });
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn new_cards(
        &self,
        mode: StudyMode,
        limit: u32,
    ) -> Result<Vec<ReviewCard>, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        let mut fresh: Vec<ReviewCard> = guard
            .values()
            .filter(|card| card.mode() == mode && card.is_new())
            .cloned()
            .collect();
        fresh.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.word().cmp(b.word()))
        });
        fresh.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(fresh)
    }

    async fn get_spelling(&self, word: &str) -> Result<SpellingTracker, StorageError> {
        let guard = self.spelling.lock().map_err(lock_err)?;
        Ok(guard
            .get(word)
            .map(|samples| SpellingTracker::from_samples(samples.iter().copied()))
            .unwrap_or_default())
    }

    async fn save_spelling(
        &self,
        word: &str,
        tracker: &SpellingTracker,
    ) -> Result<(), StorageError> {
        let mut guard = self.spelling.lock().map_err(lock_err)?;
        guard.insert(word.to_owned(), tracker.samples());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        guard.insert(progress.topic_id().clone(), progress.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        topic_id: &TopicId,
    ) -> Result<Option<TopicProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(topic_id).cloned())
    }
}

#[async_trait]
impl PlacementRepository for InMemoryRepository {
    async fn save_outcome(&self, outcome: &PlacementOutcome) -> Result<(), StorageError> {
        let mut guard = self.placements.lock().map_err(lock_err)?;
        guard.push(*outcome);
        Ok(())
    }

    async fn latest_outcome(&self) -> Result<Option<PlacementOutcome>, StorageError> {
        let guard = self.placements.lock().map_err(lock_err)?;
        Ok(guard.last().copied())
    }
}

#[async_trait]
impl SessionLogRepository for InMemoryRepository {
    async fn append_log(&self, record: &SessionLogRecord) -> Result<i64, StorageError> {
        let mut guard = self.logs.lock().map_err(lock_err)?;
        let (next_id, records) = &mut *guard;
        *next_id += 1;
        let id = *next_id;

        let mut stored = record.clone();
        stored.id = Some(id);
        records.push(stored);

        // Append-only, but capped: drop the oldest entries beyond the cap.
        if records.len() > SESSION_LOG_CAP {
            let excess = records.len() - SESSION_LOG_CAP;
            records.drain(..excess);
        }
        Ok(id)
    }

    async fn list_logs(&self, limit: u32) -> Result<Vec<SessionLogRecord>, StorageError> {
        let guard = self.logs.lock().map_err(lock_err)?;
        let (_, records) = &*guard;
        Ok(records
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
