use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::model::{GameRecord, Question};
use tracing::debug;

use crate::error::RoundError;

//
// ─── DISPLAY ───────────────────────────────────────────────────────────────────
//

/// Position of the round shown to the player, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub question_ordinal: u32,
    pub total: u32,
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.question_ordinal, self.total)
    }
}

/// A question ready to be shown, together with its position in the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStep {
    pub question: Question,
    pub display: DisplayState,
}

//
// ─── STATE MACHINE OUTPUTS ─────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    AwaitingQuestion,
    QuestionShown,
    Finished,
}

/// What the owner must do after an answer was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    /// Ask the question source for the next question.
    RequestNext,
    /// The round is over; the record must be handed to statistics once.
    Finished(GameRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub step: RoundStep,
}

/// Result of a question delivery from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    QuestionAvailable(QuestionStep),
    /// The source ran dry after at least one answer; the round ended early.
    Finished(GameRecord),
    /// The source ran dry before the first question.
    Exhausted,
    /// Delivery arrived while no request was outstanding.
    Ignored,
}

//
// ─── ROUND ─────────────────────────────────────────────────────────────────────
//

/// One play-through of a fixed number of yes/no questions.
///
/// `Round` never talks to the question source itself. It tracks whether a
/// request is outstanding and tells its owner when to issue one, so at most
/// one request is in flight per round.
#[derive(Debug, Clone)]
pub struct Round {
    total: u32,
    index: u32,
    correct: u32,
    current: Option<Question>,
    awaiting: bool,
    finished: bool,
    record: Option<GameRecord>,
}

impl Round {
    /// # Errors
    ///
    /// Returns `RoundError::InvalidQuestionCount` if `total` is zero.
    pub fn new(total: u32) -> Result<Self, RoundError> {
        if total == 0 {
            return Err(RoundError::InvalidQuestionCount);
        }
        Ok(Self {
            total,
            index: 0,
            correct: 0,
            current: None,
            awaiting: false,
            finished: false,
            record: None,
        })
    }

    /// Reset progress and mark the first question request as outstanding.
    pub fn start(&mut self) {
        self.index = 0;
        self.correct = 0;
        self.current = None;
        self.finished = false;
        self.record = None;
        self.awaiting = true;
    }

    #[must_use]
    pub fn state(&self) -> RoundState {
        if self.finished {
            RoundState::Finished
        } else if self.current.is_some() {
            RoundState::QuestionShown
        } else {
            RoundState::AwaitingQuestion
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of answered questions.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn record(&self) -> Option<&GameRecord> {
        self.record.as_ref()
    }

    #[must_use]
    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            question_ordinal: (self.index + 1).min(self.total),
            total: self.total,
        }
    }

    /// Apply a question delivered by the source.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::Record` if the early-finish record cannot be built.
    pub fn on_question_received(
        &mut self,
        question: Option<Question>,
        now: DateTime<Utc>,
    ) -> Result<RoundEvent, RoundError> {
        if self.finished || !self.awaiting {
            debug!(index = self.index, "question delivered without a pending request");
            return Ok(RoundEvent::Ignored);
        }
        self.awaiting = false;

        match question {
            Some(question) => {
                self.current = Some(question.clone());
                Ok(RoundEvent::QuestionAvailable(QuestionStep {
                    question,
                    display: self.display_state(),
                }))
            }
            None if self.index == 0 => {
                self.finished = true;
                Ok(RoundEvent::Exhausted)
            }
            None => self.finish(now).map(RoundEvent::Finished),
        }
    }

    /// The outstanding request failed; the owner may issue a new one.
    pub fn on_request_failed(&mut self) {
        self.awaiting = false;
    }

    /// Check an answer against the current question and advance.
    ///
    /// The current question is consumed, so a second answer for the same
    /// question is rejected until the next one arrives.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::Finished` after the round ended and
    /// `RoundError::NoActiveQuestion` when no question is shown. Neither
    /// changes the round.
    pub fn submit_answer(
        &mut self,
        answer: bool,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, RoundError> {
        if self.finished {
            return Err(RoundError::Finished);
        }
        let Some(question) = self.current.take() else {
            return Err(RoundError::NoActiveQuestion);
        };

        let is_correct = question.is_correct(answer);
        if is_correct {
            self.correct += 1;
        }
        self.index += 1;

        let step = if self.index >= self.total {
            RoundStep::Finished(self.finish(now)?)
        } else {
            self.awaiting = true;
            RoundStep::RequestNext
        };

        Ok(AnswerOutcome { is_correct, step })
    }

    fn finish(&mut self, now: DateTime<Utc>) -> Result<GameRecord, RoundError> {
        let record = GameRecord::new(self.correct, self.total, now)?;
        self.finished = true;
        self.awaiting = false;
        self.current = None;
        self.record = Some(record);
        Ok(record)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
