//! Shared error types for the services crate.

use thiserror::Error;

use lingua_core::model::{PlacementError, SessionSummaryError, TopicError, TopicId};
use storage::repository::StorageError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TopicService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TopicServiceError {
    #[error("topic {0} has not been started")]
    NotStarted(TopicId),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PlacementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlacementServiceError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
