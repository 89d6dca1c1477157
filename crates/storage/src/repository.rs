use async_trait::async_trait;
use progression_core::model::{Learner, LearnerId, Lesson, LessonId, ProgressRecord, Quiz, QuizId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored row decoded fine but breaks a domain invariant.
    #[error("stored data violates an invariant: {0}")]
    Integrity(String),
}

/// A stored progress record plus the revision used for compare-and-swap writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedProgress {
    pub record: ProgressRecord,
    pub revision: u64,
}

/// Catalog read/write contract.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson and its prerequisite edges.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by ID, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Every published lesson, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError>;
}

/// Learner profile lookup. Levels are owned by the profile collaborator.
#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// Persist or replace a learner profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the learner cannot be stored.
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError>;

    /// Fetch a learner by ID, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError>;
}

/// Practice questions attached to lessons.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored, including
    /// when its lesson does not exist.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Questions for one lesson, ordered by ID. Empty for unknown lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quizzes(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError>;
}

/// Progress record storage with optimistic concurrency.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for one (learner, lesson) key with its revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<VersionedProgress>, StorageError>;

    /// Every record for a learner, ordered by lesson ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress(&self, learner_id: LearnerId)
    -> Result<Vec<ProgressRecord>, StorageError>;

    /// Compare-and-swap write of a record.
    ///
    /// `expected_revision` is the revision the caller read (`None` if there
    /// was no record). Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored revision no longer
    /// matches, or other storage errors.
    async fn save_progress(
        &self,
        record: &ProgressRecord,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<BTreeMap<LessonId, Lesson>>>,
    learners: Arc<Mutex<HashMap<LearnerId, Learner>>>,
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    progress: Arc<Mutex<BTreeMap<(LearnerId, LessonId), VersionedProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        let mut guard = self
            .learners
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(learner.id(), learner.clone());
        Ok(())
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError> {
        let guard = self
            .learners
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let lesson_known = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .contains_key(&quiz.lesson_id());
        if !lesson_known {
            return Err(StorageError::Integrity(format!(
                "quiz {} refers to unknown lesson {}",
                quiz.id(),
                quiz.lesson_id()
            )));
        }
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn list_quizzes(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|quiz| quiz.lesson_id() == lesson_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner_id, lesson_id)).cloned())
    }

    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .range((learner_id, LessonId::new(0))..=(learner_id, LessonId::new(u64::MAX)))
            .map(|(_, stored)| stored.record.clone())
            .collect())
    }

    async fn save_progress(
        &self,
        record: &ProgressRecord,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (record.learner_id(), record.lesson_id());
        let current = guard.get(&key).map(|stored| stored.revision);
        if current != expected_revision {
            return Err(StorageError::Conflict);
        }
        let revision = current.map_or(1, |r| r + 1);
        guard.insert(
            key,
            VersionedProgress {
                record: record.clone(),
                revision,
            },
        );
        Ok(revision)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub learners: Arc<dyn LearnerRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let learners: Arc<dyn LearnerRepository> = Arc::new(repo.clone());
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            lessons,
            learners,
            quizzes,
            progress,
        }
    }
}
