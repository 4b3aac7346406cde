use std::sync::Arc;

use lingua_core::model::{CefrLevel, PhaseCompletion, TopicId, TopicPhase, TopicProgress};
use lingua_core::time::Clock;
use storage::repository::ProgressRepository;

use crate::error::TopicServiceError;

//
// ─── CONTENT CONTRACT ──────────────────────────────────────────────────────────
//

/// Pre-authored content for one grammar topic at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDefinition {
    pub id: TopicId,
    pub level: CefrLevel,
    pub title: String,
    pub explanation: String,
    pub examples: Vec<String>,
    pub exercises: Vec<String>,
    pub flood_texts: Vec<String>,
}

impl TopicDefinition {
    /// An empty-but-valid definition for when the catalog has no content.
    ///
    /// The learner sees a "nothing available" state instead of a failed
    /// session.
    #[must_use]
    pub fn empty(id: TopicId, level: CefrLevel) -> Self {
        Self {
            id,
            level,
            title: String::new(),
            explanation: String::new(),
            examples: Vec::new(),
            exercises: Vec::new(),
            flood_texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.exercises.is_empty() && self.flood_texts.is_empty()
    }
}

/// Read-only catalog of topic definitions, keyed by topic and level.
pub trait TopicCatalog: Send + Sync {
    fn topic_definition(&self, id: &TopicId, level: CefrLevel) -> Option<TopicDefinition>;
}

/// Everything the UI needs to render a topic screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicView {
    pub definition: TopicDefinition,
    pub progress: TopicProgress,
    pub current_phase: TopicPhase,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives a learner through the acquisition phases of a grammar topic.
pub struct TopicService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    catalog: Arc<dyn TopicCatalog>,
}

impl TopicService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        catalog: Arc<dyn TopicCatalog>,
    ) -> Self {
        Self {
            clock,
            progress,
            catalog,
        }
    }

    /// Fetch a topic's progress, creating and persisting a fresh record on
    /// first start.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` on repository failures.
    pub async fn start_topic(&self, topic_id: &TopicId) -> Result<TopicProgress, TopicServiceError> {
        if let Some(existing) = self.progress.get_progress(topic_id).await? {
            return Ok(existing);
        }

        let fresh = TopicProgress::start(topic_id.clone(), self.clock.now());
        self.progress.upsert_progress(&fresh).await?;
        log::info!("started topic {topic_id}");
        Ok(fresh)
    }

    /// Apply a phase completion to a topic and persist the result.
    ///
    /// Loads the stored record, mutates it through the state machine, and
    /// writes it back; the derived phase after the mutation is returned.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotStarted` when the topic has no
    /// progress record, phase-ordering/validation errors from the state
    /// machine, and storage errors from persistence.
    pub async fn complete_phase(
        &self,
        topic_id: &TopicId,
        completion: PhaseCompletion,
    ) -> Result<TopicPhase, TopicServiceError> {
        let mut progress = self
            .progress
            .get_progress(topic_id)
            .await?
            .ok_or_else(|| TopicServiceError::NotStarted(topic_id.clone()))?;

        let phase = progress.complete_phase(completion, self.clock.now())?;
        self.progress.upsert_progress(&progress).await?;

        log::debug!("topic {topic_id} now at phase {phase}");
        Ok(phase)
    }

    /// Assemble the view for a topic screen.
    ///
    /// Missing catalog content degrades to an empty-but-valid definition
    /// rather than failing the session.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` on repository failures.
    pub async fn topic_view(
        &self,
        topic_id: &TopicId,
        level: CefrLevel,
    ) -> Result<TopicView, TopicServiceError> {
        let progress = self.start_topic(topic_id).await?;

        let definition = match self.catalog.topic_definition(topic_id, level) {
            Some(definition) => definition,
            None => {
                log::warn!("no content for topic {topic_id} at {level}");
                TopicDefinition::empty(topic_id.clone(), level)
            }
        };

        let current_phase = progress.current_phase();
        Ok(TopicView {
            definition,
            progress,
            current_phase,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
