use chrono::{DateTime, Utc};

use lingua_core::model::StudyMode;
use storage::repository::CardRepository;

use super::plan::{SessionPlan, SessionQueueBuilder};
use super::service::StudySession;
use crate::error::SessionError;

/// Storage-backed session queries and builders.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Build a session plan using repository data.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn build_plan_from_storage(
        mode: StudyMode,
        limit: u32,
        cards: &dyn CardRepository,
        now: DateTime<Utc>,
        shuffle: bool,
    ) -> Result<SessionPlan, SessionError> {
        let due = cards.due_cards(mode, now, limit).await?;
        let fresh = cards.new_cards(mode, limit).await?;

        let plan = SessionQueueBuilder::new(usize::try_from(limit).unwrap_or(usize::MAX))
            .with_shuffle(shuffle)
            .build(due, fresh);

        Ok(plan)
    }

    /// Create a session directly from storage-backed data.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no cards are available, or
    /// `SessionError::Storage` on repository failures.
    pub async fn start_from_storage(
        mode: StudyMode,
        limit: u32,
        cards: &dyn CardRepository,
        now: DateTime<Utc>,
        shuffle: bool,
    ) -> Result<StudySession, SessionError> {
        let plan = Self::build_plan_from_storage(mode, limit, cards, now, shuffle).await?;
        StudySession::new(mode, plan.cards, now)
    }
}
