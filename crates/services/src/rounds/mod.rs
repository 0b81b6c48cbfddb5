mod config;
mod controller;
mod observer;
mod report;
mod round;

pub use config::{DEFAULT_PACING, DEFAULT_QUESTION_COUNT, RoundConfig};
pub use controller::{ControllerEvent, ControllerPhase, RoundController, RoundResult};
pub use observer::RoundObserver;
pub use report::RoundReport;
pub use round::{
    AnswerOutcome, DisplayState, QuestionStep, Round, RoundEvent, RoundState, RoundStep,
};
