use std::fmt;

use thiserror::Error;

use crate::model::GameRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsAggregateError {
    #[error("cumulative correct ({correct}) exceeds cumulative total ({total})")]
    CorrectExceedsTotal { correct: u64, total: u64 },
}

//
// ─── ACCURACY ──────────────────────────────────────────────────────────────────
//

/// Overall share of correct answers, in percent.
///
/// Displays with one decimal place (`60.0`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accuracy(f64);

impl Accuracy {
    /// `0.0` when nothing has been answered yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(correct: u64, total: u64) -> Self {
        if total == 0 {
            return Self(0.0);
        }
        Self(correct as f64 / total as f64 * 100.0)
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Cross-round statistics: best game, games played and cumulative counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsAggregate {
    best_game: Option<GameRecord>,
    games_played: u32,
    cumulative_correct: u64,
    cumulative_total: u64,
}

impl StatsAggregate {
    /// Rehydrate an aggregate from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StatsAggregateError::CorrectExceedsTotal` if the cumulative
    /// counts are inconsistent.
    pub fn from_persisted(
        best_game: Option<GameRecord>,
        games_played: u32,
        cumulative_correct: u64,
        cumulative_total: u64,
    ) -> Result<Self, StatsAggregateError> {
        if cumulative_correct > cumulative_total {
            return Err(StatsAggregateError::CorrectExceedsTotal {
                correct: cumulative_correct,
                total: cumulative_total,
            });
        }
        Ok(Self {
            best_game,
            games_played,
            cumulative_correct,
            cumulative_total,
        })
    }

    /// Fold a finished game into the aggregate.
    ///
    /// The best game only changes when the new record has strictly more
    /// correct answers; a tie keeps the earlier record.
    pub fn merge(&mut self, record: &GameRecord) {
        self.games_played = self.games_played.saturating_add(1);
        self.cumulative_correct = self
            .cumulative_correct
            .saturating_add(u64::from(record.correct()));
        self.cumulative_total = self
            .cumulative_total
            .saturating_add(u64::from(record.total()));

        let replace = self
            .best_game
            .as_ref()
            .is_none_or(|best| record.is_better_than(best));
        if replace {
            self.best_game = Some(*record);
        }
    }

    #[must_use]
    pub fn best_game(&self) -> Option<&GameRecord> {
        self.best_game.as_ref()
    }

    #[must_use]
    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    #[must_use]
    pub fn cumulative_correct(&self) -> u64 {
        self.cumulative_correct
    }

    #[must_use]
    pub fn cumulative_total(&self) -> u64 {
        self.cumulative_total
    }

    #[must_use]
    pub fn total_accuracy(&self) -> Accuracy {
        Accuracy::from_counts(self.cumulative_correct, self.cumulative_total)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            best_game: self.best_game,
            games_played: self.games_played,
            total_accuracy: self.total_accuracy(),
        }
    }
}

/// Read-only view of the aggregate handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub best_game: Option<GameRecord>,
    pub games_played: u32,
    pub total_accuracy: Accuracy,
}
