//! Survey sequencer — walks a fixed question list exactly once.

use tracing::debug;

use super::model::{Question, SurveyAnswers};
use crate::error::SurveyError;

/// Outcome of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyProgress {
    /// Moved on to the question at this index.
    Next(usize),
    /// The last question was answered. Emitted once per run.
    Completed(SurveyAnswers),
}

/// Linear question walker. No branching, skipping, or going back.
#[derive(Debug, Clone)]
pub struct SurveySequencer {
    questions: Vec<Question>,
    index: usize,
    answers: SurveyAnswers,
}

impl SurveySequencer {
    pub fn new(questions: Vec<Question>) -> Result<Self, SurveyError> {
        if questions.is_empty() {
            return Err(SurveyError::Empty);
        }
        Ok(Self {
            questions,
            index: 0,
            answers: SurveyAnswers::default(),
        })
    }

    /// The question awaiting an answer, or `None` once complete.
    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.questions.len()
    }

    /// Record `value` for the current question and advance.
    ///
    /// Choice questions only accept one of their declared options.
    pub fn answer_current(&mut self, value: impl Into<String>) -> Result<SurveyProgress, SurveyError> {
        let question = self.current().ok_or(SurveyError::AlreadyComplete)?;
        let value = value.into();

        if let Question::Choice { key, options, .. } = question {
            if !options.iter().any(|o| *o == value) {
                return Err(SurveyError::InvalidChoice {
                    key: key.clone(),
                    value,
                    options: options.join(", "),
                });
            }
        }

        let key = question.key().to_string();
        debug!(key = %key, index = self.index, "Survey answer recorded");
        self.answers.insert(&key, value);
        self.index += 1;

        if self.is_complete() {
            Ok(SurveyProgress::Completed(std::mem::take(&mut self.answers)))
        } else {
            Ok(SurveyProgress::Next(self.index))
        }
    }
}
