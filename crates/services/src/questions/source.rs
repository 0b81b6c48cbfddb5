use async_trait::async_trait;
use quiz_core::model::Question;

use crate::error::QuestionSourceError;

/// Supplier of quiz questions.
///
/// Rounds depend only on this contract, never on where questions come from.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Prepare the source (fetch catalogs, warm caches). Called at the start
    /// of every round.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if the source cannot be prepared.
    async fn load(&self) -> Result<(), QuestionSourceError>;

    /// Produce the next question, or `None` when the source has run dry.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if a question cannot be produced.
    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError>;
}
