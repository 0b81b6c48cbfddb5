use std::time::Duration;

use crate::error::RoundError;

/// Default number of questions per round.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Default pause between an answer and the next question.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Round length and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundConfig {
    question_count: u32,
    pacing: Duration,
}

impl RoundConfig {
    /// # Errors
    ///
    /// Returns `RoundError::InvalidQuestionCount` if `question_count` is zero.
    pub fn new(question_count: u32, pacing: Duration) -> Result<Self, RoundError> {
        if question_count == 0 {
            return Err(RoundError::InvalidQuestionCount);
        }
        Ok(Self {
            question_count,
            pacing,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        self.pacing
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            pacing: DEFAULT_PACING,
        }
    }
}
