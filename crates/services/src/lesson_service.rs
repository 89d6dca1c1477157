use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use progression_core::{
    access::{self, AccessDecision},
    model::{
        LearnerId, Lesson, LessonId, LessonType, Level, ProgressRecord, ProgressStatus, Quiz,
    },
    time::Clock,
};
use storage::repository::{
    LearnerRepository, LessonRepository, ProgressRepository, QuizRepository,
};

use crate::error::ServiceError;
use crate::snapshot::{load_catalog, load_learner, load_progress, report};

/// Optional narrowing for [`LessonService::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LessonFilter {
    pub level: Option<Level>,
    pub lesson_type: Option<LessonType>,
}

impl LessonFilter {
    fn matches(&self, lesson: &Lesson) -> bool {
        self.level.is_none_or(|level| lesson.level() == level)
            && self.lesson_type.is_none_or(|kind| lesson.lesson_type() == kind)
    }
}

/// The learner's standing on a lesson, `not_started` when untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub status: ProgressStatus,
    pub score: Option<u8>,
    pub attempts: u32,
}

impl From<Option<&ProgressRecord>> for ProgressSnapshot {
    fn from(record: Option<&ProgressRecord>) -> Self {
        record.map_or(
            Self {
                status: ProgressStatus::NotStarted,
                score: None,
                attempts: 0,
            },
            |r| Self {
                status: r.status(),
                score: r.score(),
                attempts: r.attempts(),
            },
        )
    }
}

/// One row of a learner's lesson list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonListing {
    pub lesson: Lesson,
    pub progress: ProgressSnapshot,
    /// Both gates pass right now.
    pub unlocked: bool,
}

/// A lesson with its quizzes, the learner's full record and the gate outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonDetail {
    pub lesson: Lesson,
    pub quizzes: Vec<Quiz>,
    pub progress: ProgressRecord,
    pub access: AccessDecision,
}

/// Read-side lesson browsing for a learner.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    learners: Arc<dyn LearnerRepository>,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        learners: Arc<dyn LearnerRepository>,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            learners,
            quizzes,
            progress,
        }
    }

    /// Lessons at or below the learner's level, easiest first.
    ///
    /// Lessons still waiting on prerequisites are listed with `unlocked = false`.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound`, integrity errors, or storage failures.
    pub async fn list(
        &self,
        learner_id: LearnerId,
        filter: LessonFilter,
    ) -> Result<Vec<LessonListing>, ServiceError> {
        self.list_inner(learner_id, filter).await.map_err(report)
    }

    async fn list_inner(
        &self,
        learner_id: LearnerId,
        filter: LessonFilter,
    ) -> Result<Vec<LessonListing>, ServiceError> {
        let learner = load_learner(self.learners.as_ref(), learner_id).await?;
        let catalog = load_catalog(self.lessons.as_ref()).await?;
        let index = load_progress(self.progress.as_ref(), learner_id).await?;

        let mut visible: Vec<&Lesson> = catalog
            .iter()
            .filter(|lesson| learner.current_level().admits(lesson.level()))
            .filter(|lesson| filter.matches(lesson))
            .collect();
        visible.sort_by_key(|lesson| (lesson.difficulty(), lesson.id()));

        let mut listings = Vec::with_capacity(visible.len());
        for lesson in visible {
            let decision = access::evaluate(&learner, lesson, &catalog, &index)?;
            listings.push(LessonListing {
                lesson: lesson.clone(),
                progress: ProgressSnapshot::from(index.get(lesson.id())),
                unlocked: decision.is_granted(),
            });
        }

        debug!(learner = %learner_id, count = listings.len(), "lessons listed");
        Ok(listings)
    }

    /// One lesson with its quizzes, the learner's record and access decision.
    ///
    /// # Errors
    ///
    /// - `LessonNotFound` / `LearnerNotFound` for unknown ids.
    /// - `AccessDenied` when the lesson is above the learner's level.
    /// - Integrity errors or storage failures.
    pub async fn detail(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<LessonDetail, ServiceError> {
        self.detail_inner(learner_id, lesson_id)
            .await
            .map_err(report)
    }

    async fn detail_inner(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<LessonDetail, ServiceError> {
        let learner = load_learner(self.learners.as_ref(), learner_id).await?;
        let catalog = load_catalog(self.lessons.as_ref()).await?;
        let lesson = catalog
            .get(lesson_id)
            .ok_or(ServiceError::LessonNotFound(lesson_id))?;
        let index = load_progress(self.progress.as_ref(), learner_id).await?;

        let decision = access::evaluate(&learner, lesson, &catalog, &index)?;
        if let AccessDecision::LevelLocked { .. } = decision {
            warn!(learner = %learner_id, lesson = %lesson_id, %decision, "lesson detail refused");
            return Err(ServiceError::AccessDenied {
                lesson: lesson_id,
                decision,
            });
        }

        let progress = index
            .get(lesson_id)
            .cloned()
            .unwrap_or_else(|| ProgressRecord::untouched(learner_id, lesson_id, self.clock.now()));
        let quizzes = self.quizzes.list_quizzes(lesson_id).await?;

        Ok(LessonDetail {
            lesson: lesson.clone(),
            quizzes,
            progress,
            access: decision,
        })
    }
}
