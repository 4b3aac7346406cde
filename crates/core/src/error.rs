use thiserror::Error;

use crate::model::{CardError, PlacementError, ReviewError, TopicError};
use crate::scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
