use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LearnerId, LessonId};

/// Highest score a record can carry; scores are percentages.
pub const MAX_SCORE: u8 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown progress status {0:?}; expected not_started, in_progress, completed or mastered")]
    UnknownStatus(String),

    #[error("progress record for learner {record} does not belong to learner {expected}")]
    ForeignRecord {
        expected: LearnerId,
        record: LearnerId,
    },

    #[error("invalid persisted progress state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Where a learner stands on one lesson.
///
/// `NotStarted → InProgress → Completed → Mastered`; a learner may go back to
/// `InProgress` by asking for it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Mastered,
}

impl ProgressStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Mastered => "mastered",
        }
    }

    /// Completed or mastered; the statuses that satisfy a prerequisite.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Mastered)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "mastered" => Ok(Self::Mastered),
            _ => Err(ProgressError::UnknownStatus(s.to_owned())),
        }
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Durable state of one learner's engagement with one lesson.
///
/// Only [`crate::tracker`] mutates a record. A missing record means
/// "not started, zero attempts", which is exactly what [`ProgressRecord::untouched`]
/// builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    learner_id: LearnerId,
    lesson_id: LessonId,
    status: ProgressStatus,
    score: Option<u8>,
    attempts: u32,
    time_spent_secs: u64,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// The implicit record for a lesson nobody has touched yet.
    #[must_use]
    pub fn untouched(learner_id: LearnerId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            lesson_id,
            status: ProgressStatus::NotStarted,
            score: None,
            attempts: 0,
            time_spent_secs: 0,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a record from storage, re-checking the state machine invariants.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPersistedState` if the stored fields
    /// contradict each other.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        learner_id: LearnerId,
        lesson_id: LessonId,
        status: ProgressStatus,
        score: Option<u8>,
        attempts: u32,
        time_spent_secs: u64,
        completed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if let Some(s) = score.filter(|s| *s > MAX_SCORE) {
            return Err(ProgressError::InvalidPersistedState(format!(
                "score {s} exceeds {MAX_SCORE}"
            )));
        }
        if status == ProgressStatus::NotStarted && attempts > 0 {
            return Err(ProgressError::InvalidPersistedState(
                "not_started record has attempts".into(),
            ));
        }
        if status != ProgressStatus::NotStarted && attempts == 0 {
            return Err(ProgressError::InvalidPersistedState(format!(
                "{status} record has no attempts"
            )));
        }
        if status.is_finished() && completed_at.is_none() {
            return Err(ProgressError::InvalidPersistedState(format!(
                "{status} record has no completion timestamp"
            )));
        }

        Ok(Self {
            learner_id,
            lesson_id,
            status,
            score,
            attempts,
            time_spent_secs,
            completed_at,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
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
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True if the learner has ever completed this lesson.
    #[must_use]
    pub fn was_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub(crate) fn apply(
        &mut self,
        status: ProgressStatus,
        score: Option<u8>,
        time_spent_secs: u64,
        now: DateTime<Utc>,
    ) {
        self.attempts = self.attempts.saturating_add(1);
        self.time_spent_secs = self.time_spent_secs.saturating_add(time_spent_secs);
        self.status = status;
        if score.is_some() {
            self.score = score;
        }
        if status == ProgressStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }
}

//
// ─── INDEX ─────────────────────────────────────────────────────────────────────
//

/// Snapshot of every progress record one learner has, keyed by lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressIndex {
    learner_id: LearnerId,
    records: BTreeMap<LessonId, ProgressRecord>,
}

impl ProgressIndex {
    #[must_use]
    pub fn empty(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            records: BTreeMap::new(),
        }
    }

    /// Build an index from the records storage returned for `learner_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ForeignRecord` if a record belongs to another learner.
    pub fn from_records(
        learner_id: LearnerId,
        records: impl IntoIterator<Item = ProgressRecord>,
    ) -> Result<Self, ProgressError> {
        let mut index = Self::empty(learner_id);
        for record in records {
            index.insert(record)?;
        }
        Ok(index)
    }

    /// Insert or replace the record for its lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ForeignRecord` if the record belongs to another learner.
    pub fn insert(&mut self, record: ProgressRecord) -> Result<(), ProgressError> {
        if record.learner_id != self.learner_id {
            return Err(ProgressError::ForeignRecord {
                expected: self.learner_id,
                record: record.learner_id,
            });
        }
        self.records.insert(record.lesson_id, record);
        Ok(())
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn get(&self, lesson_id: LessonId) -> Option<&ProgressRecord> {
        self.records.get(&lesson_id)
    }

    /// Status for a lesson, `NotStarted` when there is no record.
    #[must_use]
    pub fn status(&self, lesson_id: LessonId) -> ProgressStatus {
        self.get(lesson_id)
            .map_or(ProgressStatus::NotStarted, ProgressRecord::status)
    }

    /// Records ordered by lesson id.
    pub fn records(&self) -> impl Iterator<Item = &ProgressRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!(
            "completed".parse::<ProgressStatus>().unwrap(),
            ProgressStatus::Completed
        );
        let err = "done".parse::<ProgressStatus>().unwrap_err();
        assert_eq!(err, ProgressError::UnknownStatus("done".into()));
    }

    #[test]
    fn finished_statuses() {
        assert!(!ProgressStatus::NotStarted.is_finished());
        assert!(!ProgressStatus::InProgress.is_finished());
        assert!(ProgressStatus::Completed.is_finished());
        assert!(ProgressStatus::Mastered.is_finished());
    }

    #[test]
    fn untouched_record_is_not_started() {
        let record = ProgressRecord::untouched(LearnerId::new(1), LessonId::new(2), fixed_now());
        assert_eq!(record.status(), ProgressStatus::NotStarted);
        assert_eq!(record.attempts(), 0);
        assert_eq!(record.score(), None);
        assert!(!record.was_completed());
    }

    #[test]
    fn from_persisted_rejects_completed_without_timestamp() {
        let err = ProgressRecord::from_persisted(
            LearnerId::new(1),
            LessonId::new(1),
            ProgressStatus::Completed,
            Some(80),
            1,
            60,
            None,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::InvalidPersistedState(_)));
    }

    #[test]
    fn from_persisted_rejects_score_above_max() {
        let err = ProgressRecord::from_persisted(
            LearnerId::new(1),
            LessonId::new(1),
            ProgressStatus::InProgress,
            Some(101),
            1,
            60,
            None,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds 100"));
    }

    #[test]
    fn index_defaults_missing_lessons_to_not_started() {
        let index = ProgressIndex::empty(LearnerId::new(1));
        assert_eq!(index.status(LessonId::new(9)), ProgressStatus::NotStarted);
        assert!(index.is_empty());
    }

    #[test]
    fn index_rejects_foreign_records() {
        let record = ProgressRecord::untouched(LearnerId::new(2), LessonId::new(1), fixed_now());
        let err = ProgressIndex::from_records(LearnerId::new(1), [record]).unwrap_err();
        assert!(matches!(err, ProgressError::ForeignRecord { .. }));
    }
}
