use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, QuizId};

/// Weight of an ordinary question, in hundredths.
pub const DEFAULT_QUIZ_WEIGHT: u16 = 100;
/// Largest weight a question may carry (9.99).
pub const MAX_QUIZ_WEIGHT: u16 = 999;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz question text cannot be empty")]
    EmptyQuestion,

    #[error("quiz {0} has no correct answer")]
    EmptyAnswer(QuizId),

    #[error("quiz {0} is multiple choice but offers fewer than two options")]
    TooFewOptions(QuizId),

    #[error("quiz {0}: correct answer is not among the options")]
    AnswerNotOffered(QuizId),

    #[error("quiz {quiz}: weight {weight} exceeds 999 hundredths")]
    WeightOutOfRange { quiz: QuizId, weight: u16 },

    #[error("unknown question type {0:?}")]
    UnknownType(String),
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    Speaking,
    Listening,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::Speaking => "speaking",
            QuestionType::Listening => "listening",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "fill_blank" => Ok(Self::FillBlank),
            "speaking" => Ok(Self::Speaking),
            "listening" => Ok(Self::Listening),
            _ => Err(QuizError::UnknownType(s.to_owned())),
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A practice question attached to a lesson. Shown with lesson detail only;
/// quiz answers do not feed progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    id: QuizId,
    lesson_id: LessonId,
    question_text: String,
    question_type: QuestionType,
    correct_answer: String,
    options: Vec<String>,
    audio_ref: Option<String>,
    difficulty_weight: u16,
}

impl Quiz {
    /// Builds a question. `difficulty_weight` is in hundredths
    /// ([`DEFAULT_QUIZ_WEIGHT`] is 1.0).
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the question or answer is blank, a multiple
    /// choice question does not offer its own answer among at least two
    /// options, or the weight is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuizId,
        lesson_id: LessonId,
        question_text: impl Into<String>,
        question_type: QuestionType,
        correct_answer: impl Into<String>,
        options: Vec<String>,
        audio_ref: Option<String>,
        difficulty_weight: u16,
    ) -> Result<Self, QuizError> {
        let question_text = question_text.into();
        if question_text.trim().is_empty() {
            return Err(QuizError::EmptyQuestion);
        }
        let correct_answer = correct_answer.into();
        if correct_answer.trim().is_empty() {
            return Err(QuizError::EmptyAnswer(id));
        }
        if question_type == QuestionType::MultipleChoice {
            if options.len() < 2 {
                return Err(QuizError::TooFewOptions(id));
            }
            if !options.contains(&correct_answer) {
                return Err(QuizError::AnswerNotOffered(id));
            }
        }
        if difficulty_weight > MAX_QUIZ_WEIGHT {
            return Err(QuizError::WeightOutOfRange {
                quiz: id,
                weight: difficulty_weight,
            });
        }

        Ok(Self {
            id,
            lesson_id,
            question_text,
            question_type,
            correct_answer,
            options,
            audio_ref,
            difficulty_weight,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn audio_ref(&self) -> Option<&str> {
        self.audio_ref.as_deref()
    }

    /// Weight in hundredths.
    #[must_use]
    pub fn difficulty_weight(&self) -> u16 {
        self.difficulty_weight
    }
}
