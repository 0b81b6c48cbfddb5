mod game_record;
mod question;
mod stats;

pub use game_record::{GameRecord, GameRecordError};
pub use question::{PosterImage, Question};
pub use stats::{Accuracy, StatsAggregate, StatsAggregateError, StatsSnapshot};
