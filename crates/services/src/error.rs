//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::GameRecordError;
use storage::repository::StorageError;

/// Errors emitted by `Round`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("no active question to answer")]
    NoActiveQuestion,
    #[error("round already finished")]
    Finished,
    #[error("question count must be > 0")]
    InvalidQuestionCount,
    #[error(transparent)]
    Record(#[from] GameRecordError),
}

/// Errors reported by a `QuestionSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error("question source has not been loaded")]
    NotLoaded,
    #[error("movie catalog is empty")]
    EmptyCatalog,
    #[error("failed to read question data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode question data: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Failed(String),
}

/// Errors emitted by `StatisticsStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error(transparent)]
    Persistence(#[from] StorageError),
    #[error("stored statistics are corrupt: {0}")]
    Corrupt(String),
}

/// Errors emitted by `RoundController`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("no round has been started")]
    NoRound,
    #[error(transparent)]
    Round(#[from] RoundError),
}
