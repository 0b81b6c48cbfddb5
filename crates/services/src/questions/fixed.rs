use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use quiz_core::model::Question;

use super::source::QuestionSource;
use crate::error::QuestionSourceError;

/// A finite, prepared list of questions handed out in order.
#[derive(Debug, Default)]
pub struct FixedQuestionSource {
    questions: Mutex<VecDeque<Question>>,
}

impl FixedQuestionSource {
    #[must_use]
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        Self {
            questions: Mutex::new(questions.into_iter().collect()),
        }
    }

    /// One text-only question per expected answer, numbered from 1.
    #[must_use]
    pub fn from_answers(correct_answers: &[bool]) -> Self {
        Self::new(
            correct_answers
                .iter()
                .enumerate()
                .map(|(i, &answer)| Question::text_only(format!("Question {}", i + 1), answer)),
        )
    }

    /// Number of questions not yet handed out.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError::Failed` if the queue lock is poisoned.
    pub fn remaining(&self) -> Result<usize, QuestionSourceError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| QuestionSourceError::Failed(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl QuestionSource for FixedQuestionSource {
    async fn load(&self) -> Result<(), QuestionSourceError> {
        Ok(())
    }

    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| QuestionSourceError::Failed(e.to_string()))?;
        Ok(guard.pop_front())
    }
}
