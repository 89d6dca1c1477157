use progression_core::model::{
    DEFAULT_QUIZ_WEIGHT, Learner, LearnerId, Lesson, LessonError, LessonId, LessonType, Level,
    QuestionType, Quiz, QuizError, QuizId,
};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

/// Learner created by [`seed_sample_data`].
pub const DEMO_LEARNER_ID: LearnerId = LearnerId::new(1);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counts of what [`seed_sample_data`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub lessons: usize,
    pub quizzes: usize,
    /// Zero when the demo learner already existed.
    pub learners: usize,
}

// (id, title, level, type, prerequisites, difficulty, minutes)
type SampleRow = (u64, &'static str, Level, LessonType, &'static [u64], u32, u32);

const SAMPLE_LESSONS: &[SampleRow] = &[
    (1, "Basic Greetings", Level::A1, LessonType::Vocabulary, &[], 1, 15),
    (2, "Numbers 1-20", Level::A1, LessonType::Vocabulary, &[], 2, 20),
    (3, "Family Members", Level::A2, LessonType::Vocabulary, &[1], 3, 25),
    (4, "Workplace Basics", Level::A2, LessonType::Vocabulary, &[], 4, 30),
    (5, "Present Tense Verbs", Level::B1, LessonType::Grammar, &[3], 5, 35),
];

/// The beginner Norwegian catalog used for demos and tests.
///
/// # Errors
///
/// Returns `LessonError` if a sample row is malformed.
pub fn sample_lessons() -> Result<Vec<Lesson>, LessonError> {
    SAMPLE_LESSONS
        .iter()
        .map(|&(id, title, level, lesson_type, prerequisites, difficulty, minutes)| {
            Lesson::new(
                LessonId::new(id),
                title,
                level,
                lesson_type,
                prerequisites.iter().copied().map(LessonId::new).collect(),
                format!("lessons/{id}.json"),
                difficulty,
                minutes,
            )
        })
        .collect()
}

/// Practice questions for the sample catalog.
///
/// # Errors
///
/// Returns `QuizError` if a sample question is malformed.
pub fn sample_quizzes() -> Result<Vec<Quiz>, QuizError> {
    let greeting = Quiz::new(
        QuizId::new(1),
        LessonId::new(1),
        "How do you say 'Hello' in Norwegian?",
        QuestionType::MultipleChoice,
        "Hei",
        ["Hei", "Ha det", "Takk", "Unnskyld"]
            .into_iter()
            .map(String::from)
            .collect(),
        None,
        DEFAULT_QUIZ_WEIGHT,
    )?;
    Ok(vec![greeting])
}

/// Write the sample catalog and its quizzes, replacing earlier copies, and
/// create the beginner demo learner unless it already exists. Rerunning never
/// resets a learner's levels.
///
/// # Errors
///
/// Returns `SeedError` if a sample row is malformed or a write fails.
pub async fn seed_sample_data(storage: &Storage) -> Result<SeedReport, SeedError> {
    let lessons = sample_lessons()?;
    for lesson in &lessons {
        storage.lessons.upsert_lesson(lesson).await?;
    }
    let quizzes = sample_quizzes()?;
    for quiz in &quizzes {
        storage.quizzes.upsert_quiz(quiz).await?;
    }

    let mut learners = 0;
    if storage.learners.get_learner(DEMO_LEARNER_ID).await?.is_none() {
        storage
            .learners
            .upsert_learner(&Learner::beginner(DEMO_LEARNER_ID))
            .await?;
        learners = 1;
    }

    Ok(SeedReport {
        lessons: lessons.len(),
        quizzes: quizzes.len(),
        learners,
    })
}
