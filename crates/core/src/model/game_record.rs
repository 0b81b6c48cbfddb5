use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameRecordError {
    #[error("a game must contain at least one question")]
    ZeroTotal,

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

/// Immutable result of one finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRecord {
    correct: u32,
    total: u32,
    date: DateTime<Utc>,
}

impl GameRecord {
    /// # Errors
    ///
    /// Returns `GameRecordError::ZeroTotal` if `total` is zero.
    /// Returns `GameRecordError::CorrectExceedsTotal` if `correct > total`.
    pub fn new(correct: u32, total: u32, date: DateTime<Utc>) -> Result<Self, GameRecordError> {
        if total == 0 {
            return Err(GameRecordError::ZeroTotal);
        }
        if correct > total {
            return Err(GameRecordError::CorrectExceedsTotal { correct, total });
        }
        Ok(Self {
            correct,
            total,
            date,
        })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Strictly more correct answers. A tie is not better.
    #[must_use]
    pub fn is_better_than(&self, other: &GameRecord) -> bool {
        self.correct > other.correct
    }
}
