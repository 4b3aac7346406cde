#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CardRepository, InMemoryRepository, PlacementRepository, ProgressRepository, SESSION_LOG_CAP,
    SessionKind, SessionLogRecord, SessionLogRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
