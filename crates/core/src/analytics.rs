use serde::Serialize;

use crate::access;
use crate::catalog::{Catalog, CatalogError};
use crate::model::{Learner, Level, ProgressIndex, ProgressStatus};

/// Derived completion figures for one learner.
///
/// Only lessons the learner can currently open are counted, so locked content
/// never drags the percentage down. Never persisted; recompute on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub current_level: Level,
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub completion_percentage: f64,
    pub in_progress_lessons: u32,
    pub mastered_lessons: u32,
    pub time_spent_secs: u64,
    pub average_score: Option<f64>,
}

/// Summarize the learner's progress over accessible lessons.
///
/// Pure and idempotent: identical inputs give identical output.
///
/// # Errors
///
/// Returns `CatalogError` when a lesson references an unknown prerequisite.
pub fn summarize(
    learner: &Learner,
    progress: &ProgressIndex,
    catalog: &Catalog,
) -> Result<ProgressSummary, CatalogError> {
    let mut total_lessons = 0u32;
    let mut completed_lessons = 0u32;
    let mut in_progress_lessons = 0u32;
    let mut mastered_lessons = 0u32;
    let mut time_spent_secs = 0u64;
    let mut score_sum = 0u64;
    let mut scored = 0u32;

    for lesson in access::accessible_lessons(learner, catalog, progress)? {
        total_lessons += 1;

        let Some(record) = progress.get(lesson.id()) else {
            continue;
        };
        match record.status() {
            ProgressStatus::Completed => completed_lessons += 1,
            ProgressStatus::Mastered => {
                completed_lessons += 1;
                mastered_lessons += 1;
            }
            ProgressStatus::InProgress => in_progress_lessons += 1,
            ProgressStatus::NotStarted => {}
        }
        time_spent_secs = time_spent_secs.saturating_add(record.time_spent_secs());
        if let Some(score) = record.score() {
            score_sum += u64::from(score);
            scored += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let average_score = (scored > 0).then(|| round1(score_sum as f64 / f64::from(scored)));

    Ok(ProgressSummary {
        current_level: learner.current_level(),
        total_lessons,
        completed_lessons,
        completion_percentage: percentage(completed_lessons, total_lessons),
        in_progress_lessons,
        mastered_lessons,
        time_spent_secs,
        average_score,
    })
}

/// `part / whole * 100`, rounded to one decimal; `0.0` for an empty whole.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(f64::from(part) / f64::from(whole) * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
