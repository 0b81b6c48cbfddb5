use chrono::{DateTime, Utc};
use quiz_core::model::{GameRecord, StatsAggregate};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// Key under which the statistics aggregate is stored.
pub const STATS_KEY: &str = "quiz.statistics";

/// Persisted shape of the statistics aggregate.
///
/// The best game is flattened into three nullable fields so the stored JSON
/// stays a single flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub best_correct: Option<u32>,
    pub best_total: Option<u32>,
    pub best_timestamp: Option<DateTime<Utc>>,
    pub games_played_count: u32,
    pub cumulative_correct: u64,
    pub cumulative_total: u64,
}

impl StatsRecord {
    #[must_use]
    pub fn from_aggregate(stats: &StatsAggregate) -> Self {
        let best = stats.best_game();
        Self {
            best_correct: best.map(GameRecord::correct),
            best_total: best.map(GameRecord::total),
            best_timestamp: best.map(GameRecord::date),
            games_played_count: stats.games_played(),
            cumulative_correct: stats.cumulative_correct(),
            cumulative_total: stats.cumulative_total(),
        }
    }

    /// Convert the record back into a domain aggregate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the best game is only partly
    /// present or any count fails domain validation.
    pub fn into_aggregate(self) -> Result<StatsAggregate, StorageError> {
        let best_game = match (self.best_correct, self.best_total, self.best_timestamp) {
            (Some(correct), Some(total), Some(date)) => Some(
                GameRecord::new(correct, total, date).map_err(ser)?,
            ),
            (None, None, None) => None,
            _ => {
                return Err(StorageError::Serialization(
                    "incomplete best game fields".into(),
                ));
            }
        };

        StatsAggregate::from_persisted(
            best_game,
            self.games_played_count,
            self.cumulative_correct,
            self.cumulative_total,
        )
        .map_err(ser)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the value is not a valid record.
    pub fn decode(raw: &str) -> Result<Self, StorageError> {
        serde_json::from_str(raw).map_err(ser)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn encode(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(ser)
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}
