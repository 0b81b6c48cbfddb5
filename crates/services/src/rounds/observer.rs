use quiz_core::model::{GameRecord, StatsSnapshot};

use super::round::QuestionStep;

/// Presentation hooks driven by `RoundController`.
///
/// Every call happens from the task that owns the controller, in the order
/// the round progresses.
pub trait RoundObserver: Send + Sync {
    fn on_question_available(&self, step: &QuestionStep);

    fn on_answer_feedback(&self, is_correct: bool);

    /// `stats` is `None` when the aggregate could not be updated or read;
    /// the round result is still reported.
    fn on_round_finished(&self, record: &GameRecord, stats: Option<&StatsSnapshot>);

    fn on_load_failed(&self, reason: &str);

    fn on_loading(&self, is_loading: bool);
}
