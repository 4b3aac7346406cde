#![forbid(unsafe_code)]

pub mod error;
pub mod placement_service;
pub mod review_service;
pub mod sessions;
pub mod topic_service;

pub use lingua_core::Clock;
pub use sessions as session;

pub use error::{PlacementServiceError, ReviewServiceError, SessionError, TopicServiceError};
pub use placement_service::{PlacementAnswerResult, PlacementService, QuestionBank};
pub use review_service::{ReviewResult, ReviewService};
pub use topic_service::{TopicCatalog, TopicDefinition, TopicService, TopicView};

pub use sessions::{
    SessionAnswerResult, SessionLoopService, SessionPlan, SessionProgress, SessionQueueBuilder,
    StudySession,
};
