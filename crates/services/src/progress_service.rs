use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use progression_core::{
    Catalog,
    analytics::{self, ProgressSummary},
    model::{Learner, LearnerId, Lesson, LessonId, Level, ProgressRecord, ProgressStatus},
    recommend,
    time::Clock,
    tracker::{self, Attempt},
};
use storage::repository::{
    LearnerRepository, LessonRepository, ProgressRepository, StorageError,
};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::snapshot::{load_catalog, load_learner, load_progress, report};

//
// ─── REQUESTS AND VIEWS ────────────────────────────────────────────────────────
//

/// Raw progress update from a caller. Validated by [`ProgressService::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSubmission {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub status: ProgressStatus,
    pub score: Option<i64>,
    pub time_spent_secs: i64,
}

/// One progress record joined with the lesson it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressDetail {
    pub lesson_id: LessonId,
    pub title: String,
    pub level: Level,
    pub status: ProgressStatus,
    pub score: Option<u8>,
    pub attempts: u32,
    pub time_spent_secs: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressDetail {
    fn new(lesson: &Lesson, record: &ProgressRecord) -> Self {
        Self {
            lesson_id: lesson.id(),
            title: lesson.title().to_owned(),
            level: lesson.level(),
            status: record.status(),
            score: record.score(),
            attempts: record.attempts(),
            time_spent_secs: record.time_spent_secs(),
            completed_at: record.completed_at(),
            updated_at: record.updated_at(),
        }
    }
}

/// Summary plus every record the learner has, ordered by lesson id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressOverview {
    pub summary: ProgressSummary,
    pub details: Vec<ProgressDetail>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records attempts and reports on a learner's progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    config: ServiceConfig,
    lessons: Arc<dyn LessonRepository>,
    learners: Arc<dyn LearnerRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: ServiceConfig,
        lessons: Arc<dyn LessonRepository>,
        learners: Arc<dyn LearnerRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            config,
            lessons,
            learners,
            progress,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Gate, apply and persist one attempt.
    ///
    /// The write is a compare-and-swap on the record's revision. When another
    /// writer wins, the record is re-read and the attempt re-gated and
    /// re-applied, up to `max_write_retries` more times.
    ///
    /// # Errors
    ///
    /// - `LearnerNotFound` / `LessonNotFound` for unknown ids.
    /// - `Attempt` for malformed input.
    /// - `AccessDenied` if either gate fails.
    /// - `Catalog` / `Progress` for integrity faults (also logged at error level).
    /// - `WriteContention` when every try lost the race.
    /// - `Storage` on repository failures.
    pub async fn submit(
        &self,
        submission: ProgressSubmission,
    ) -> Result<ProgressRecord, ServiceError> {
        self.submit_inner(submission).await.map_err(report)
    }

    async fn submit_inner(
        &self,
        submission: ProgressSubmission,
    ) -> Result<ProgressRecord, ServiceError> {
        let ProgressSubmission {
            learner_id,
            lesson_id,
            ..
        } = submission;
        let attempt = Attempt::new(
            submission.status,
            submission.score,
            submission.time_spent_secs,
        )?;

        let learner = load_learner(self.learners.as_ref(), learner_id).await?;
        let catalog = load_catalog(self.lessons.as_ref()).await?;
        let lesson = catalog
            .get(lesson_id)
            .ok_or(ServiceError::LessonNotFound(lesson_id))?;

        let tries = self.config.max_write_retries.saturating_add(1);
        for try_no in 1..=tries {
            match self.try_record(&learner, lesson, &catalog, &attempt).await {
                Ok(record) => {
                    info!(
                        learner = %learner_id,
                        lesson = %lesson_id,
                        status = %record.status(),
                        attempts = record.attempts(),
                        "progress recorded"
                    );
                    return Ok(record);
                }
                Err(ServiceError::Storage(StorageError::Conflict)) => {
                    warn!(
                        learner = %learner_id,
                        lesson = %lesson_id,
                        try_no,
                        "progress write lost a race; retrying"
                    );
                }
                Err(err @ ServiceError::AccessDenied { .. }) => {
                    warn!(
                        learner = %learner_id,
                        lesson = %lesson_id,
                        error = %err,
                        "attempt refused"
                    );
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(ServiceError::WriteContention {
            learner: learner_id,
            lesson: lesson_id,
            tries,
        })
    }

    async fn try_record(
        &self,
        learner: &Learner,
        lesson: &Lesson,
        catalog: &Catalog,
        attempt: &Attempt,
    ) -> Result<ProgressRecord, ServiceError> {
        let mut index = load_progress(self.progress.as_ref(), learner.id()).await?;
        let stored = self.progress.get_progress(learner.id(), lesson.id()).await?;
        let expected_revision = match stored {
            Some(stored) => {
                let revision = stored.revision;
                index.insert(stored.record)?;
                Some(revision)
            }
            None => None,
        };

        let record = tracker::record_attempt(
            learner,
            lesson,
            catalog,
            &index,
            attempt,
            self.clock.now(),
        )?;
        self.progress
            .save_progress(&record, expected_revision)
            .await?;
        Ok(record)
    }

    /// Summary over accessible lessons plus the learner's record list.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound`, integrity errors, or storage failures.
    pub async fn overview(&self, learner_id: LearnerId) -> Result<ProgressOverview, ServiceError> {
        self.overview_inner(learner_id).await.map_err(report)
    }

    async fn overview_inner(
        &self,
        learner_id: LearnerId,
    ) -> Result<ProgressOverview, ServiceError> {
        let learner = load_learner(self.learners.as_ref(), learner_id).await?;
        let catalog = load_catalog(self.lessons.as_ref()).await?;
        let index = load_progress(self.progress.as_ref(), learner_id).await?;

        let summary = analytics::summarize(&learner, &index, &catalog)?;
        let details = index
            .records()
            .map(|record| {
                catalog
                    .get(record.lesson_id())
                    .map(|lesson| ProgressDetail::new(lesson, record))
                    .ok_or(ServiceError::OrphanedProgress(record.lesson_id()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            learner = %learner_id,
            total = summary.total_lessons,
            completed = summary.completed_lessons,
            "progress summarized"
        );
        Ok(ProgressOverview { summary, details })
    }

    /// Accessible, not-yet-mastered lessons, easiest first.
    ///
    /// `None` uses the configured default limit.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound`, integrity errors, or storage failures.
    pub async fn recommendations(
        &self,
        learner_id: LearnerId,
        limit: Option<usize>,
    ) -> Result<Vec<Lesson>, ServiceError> {
        self.recommendations_inner(learner_id, limit)
            .await
            .map_err(report)
    }

    async fn recommendations_inner(
        &self,
        learner_id: LearnerId,
        limit: Option<usize>,
    ) -> Result<Vec<Lesson>, ServiceError> {
        let limit = limit.unwrap_or(self.config.default_recommendation_limit);
        let learner = load_learner(self.learners.as_ref(), learner_id).await?;
        let catalog = load_catalog(self.lessons.as_ref()).await?;
        let index = load_progress(self.progress.as_ref(), learner_id).await?;

        let picked = recommend::recommend(&learner, &catalog, &index, limit)?;
        debug!(learner = %learner_id, limit, picked = picked.len(), "recommendations selected");
        Ok(picked.into_iter().cloned().collect())
    }
}
