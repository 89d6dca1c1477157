use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::access::{self, AccessDecision};
use crate::catalog::{Catalog, CatalogError};
use crate::model::{
    Learner, Lesson, LessonId, MAX_SCORE, ProgressIndex, ProgressRecord, ProgressStatus,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Malformed attempt input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("time spent must be non-negative, got {provided} seconds")]
    NegativeTimeSpent { provided: i64 },

    #[error("score must be between 0 and 100, got {provided}")]
    ScoreOutOfRange { provided: i64 },

    #[error("an attempt cannot leave a lesson not_started")]
    NotStartedRequested,

    #[error("lesson {0} must be completed before it can be mastered")]
    MasteryBeforeCompletion(LessonId),
}

/// Reasons `record_attempt` can refuse to apply an attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("lesson {lesson} is locked: {decision}")]
    AccessDenied {
        lesson: LessonId,
        decision: AccessDecision,
    },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One validated progress submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attempt {
    status: ProgressStatus,
    score: Option<u8>,
    time_spent_secs: u64,
}

impl Attempt {
    /// Validate raw caller input.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the time delta is negative, the score falls
    /// outside 0..=100, or the requested status is `not_started`.
    pub fn new(
        status: ProgressStatus,
        score: Option<i64>,
        time_spent_delta_secs: i64,
    ) -> Result<Self, AttemptError> {
        if status == ProgressStatus::NotStarted {
            return Err(AttemptError::NotStartedRequested);
        }

        let time_spent_secs = u64::try_from(time_spent_delta_secs).map_err(|_| {
            AttemptError::NegativeTimeSpent {
                provided: time_spent_delta_secs,
            }
        })?;

        let score = score
            .map(|raw| {
                u8::try_from(raw)
                    .ok()
                    .filter(|s| *s <= MAX_SCORE)
                    .ok_or(AttemptError::ScoreOutOfRange { provided: raw })
            })
            .transpose()?;

        Ok(Self {
            status,
            score,
            time_spent_secs,
        })
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.score
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Apply `attempt` to the learner's record for `lesson`, enforcing the access gate.
///
/// The tracker never changes status on its own: the record takes exactly the
/// requested status. The completion timestamp is written on the first
/// transition into `completed` and never again.
///
/// Returns the post-transition record; persisting it is the caller's job.
///
/// # Errors
///
/// - `TrackerError::AccessDenied` if either gate fails.
/// - `TrackerError::Attempt` if mastery is requested before completion.
/// - `TrackerError::Catalog` if the lesson references an unknown prerequisite.
pub fn record_attempt(
    learner: &Learner,
    lesson: &Lesson,
    catalog: &Catalog,
    progress: &ProgressIndex,
    attempt: &Attempt,
    now: DateTime<Utc>,
) -> Result<ProgressRecord, TrackerError> {
    let decision = access::evaluate(learner, lesson, catalog, progress)?;
    if !decision.is_granted() {
        return Err(TrackerError::AccessDenied {
            lesson: lesson.id(),
            decision,
        });
    }

    let mut record = progress
        .get(lesson.id())
        .cloned()
        .unwrap_or_else(|| ProgressRecord::untouched(learner.id(), lesson.id(), now));

    apply_attempt(&mut record, attempt, now)?;
    Ok(record)
}

/// State-machine step on a single record, with no gating.
///
/// # Errors
///
/// Returns `AttemptError::MasteryBeforeCompletion` if `mastered` is requested
/// for a record that was never completed.
pub fn apply_attempt(
    record: &mut ProgressRecord,
    attempt: &Attempt,
    now: DateTime<Utc>,
) -> Result<(), AttemptError> {
    if attempt.status == ProgressStatus::Mastered && !record.was_completed() {
        return Err(AttemptError::MasteryBeforeCompletion(record.lesson_id()));
    }

    record.apply(attempt.status, attempt.score, attempt.time_spent_secs, now);
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
