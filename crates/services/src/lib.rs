#![forbid(unsafe_code)]

pub mod error;
pub mod questions;
pub mod rounds;
pub mod statistics;

pub use quiz_core::Clock;

pub use error::{ControllerError, QuestionSourceError, RoundError, StatsError};
pub use questions::{
    FixedQuestionSource, JsonMoviesLoader, Movie, MovieQuestionSource, MoviesLoader,
    QuestionSource,
};
pub use rounds::{
    AnswerOutcome, ControllerEvent, ControllerPhase, DisplayState, QuestionStep, Round,
    RoundConfig, RoundController, RoundEvent, RoundObserver, RoundReport, RoundResult,
    RoundState, RoundStep,
};
pub use statistics::StatisticsStore;
