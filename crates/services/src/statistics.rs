use std::sync::Arc;

use quiz_core::model::{GameRecord, StatsAggregate, StatsSnapshot};
use storage::repository::{InMemoryKeyValueStore, KeyValueStore, StorageError};
use storage::stats_record::{STATS_KEY, StatsRecord};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StatsError;

/// Durable aggregate over every finished round.
///
/// The whole aggregate lives under a single key, so each update is one
/// read-modify-write of one value. Updates are serialized through an async
/// mutex; reads are not.
pub struct StatisticsStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl StatisticsStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    /// Fold a finished game into the persisted aggregate.
    ///
    /// Must be called once per finished round; a second call counts the game
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Persistence` if the aggregate cannot be read or
    /// written, and `StatsError::Corrupt` if the stored value is unreadable.
    /// On error the stored aggregate is unchanged.
    pub async fn record(&self, record: &GameRecord) -> Result<(), StatsError> {
        let _guard = self.write_lock.lock().await;

        let mut stats = self.load().await?;
        stats.merge(record);

        let raw = StatsRecord::from_aggregate(&stats).encode()?;
        self.store.set(STATS_KEY, &raw).await?;

        debug!(
            correct = record.correct(),
            total = record.total(),
            games_played = stats.games_played(),
            "recorded game statistics"
        );
        Ok(())
    }

    /// Current best game, games played and overall accuracy.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if the aggregate cannot be read.
    pub async fn current_stats(&self) -> Result<StatsSnapshot, StatsError> {
        Ok(self.load().await?.snapshot())
    }

    /// Forget all history.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Persistence` if the value cannot be removed.
    pub async fn reset(&self) -> Result<(), StatsError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(STATS_KEY).await?;
        Ok(())
    }

    async fn load(&self) -> Result<StatsAggregate, StatsError> {
        let Some(raw) = self.store.get(STATS_KEY).await? else {
            return Ok(StatsAggregate::default());
        };
        StatsRecord::decode(&raw)
            .and_then(StatsRecord::into_aggregate)
            .map_err(|err| match err {
                StorageError::Serialization(msg) => StatsError::Corrupt(msg),
                other => StatsError::Persistence(other),
            })
    }
}
