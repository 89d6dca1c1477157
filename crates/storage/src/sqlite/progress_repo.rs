use progression_core::model::{LearnerId, LessonId, ProgressRecord};

use super::SqliteRepository;
use super::mapping::{
    conn, learner_id_to_i64, lesson_id_to_i64, map_progress_row, map_versioned_progress_row,
    u64_to_i64,
};
use crate::repository::{ProgressRepository, StorageError, VersionedProgress};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, lesson_id, status, score, attempts, time_spent_secs,
                   completed_at, created_at, updated_at, revision
            FROM progress
            WHERE learner_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(learner_id_to_i64(learner_id)?)
        .bind(lesson_id_to_i64(lesson_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_versioned_progress_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, lesson_id, status, score, attempts, time_spent_secs,
                   completed_at, created_at, updated_at
            FROM progress
            WHERE learner_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(learner_id_to_i64(learner_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn save_progress(
        &self,
        record: &ProgressRecord,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let learner_id = learner_id_to_i64(record.learner_id())?;
        let lesson_id = lesson_id_to_i64(record.lesson_id())?;
        let score = record.score().map(i64::from);
        let attempts = i64::from(record.attempts());
        let time_spent = u64_to_i64("time_spent_secs", record.time_spent_secs())?;

        let (result, revision) = match expected_revision {
            // First write for the key: lose the race if another writer inserted first.
            None => {
                let res = sqlx::query(
                    r"
                    INSERT INTO progress (
                        learner_id, lesson_id, status, score, attempts, time_spent_secs,
                        completed_at, created_at, updated_at, revision
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)
                    ON CONFLICT(learner_id, lesson_id) DO NOTHING
                    ",
                )
                .bind(learner_id)
                .bind(lesson_id)
                .bind(record.status().as_str())
                .bind(score)
                .bind(attempts)
                .bind(time_spent)
                .bind(record.completed_at())
                .bind(record.created_at())
                .bind(record.updated_at())
                .execute(&self.pool)
                .await
                .map_err(conn)?;
                (res, 1)
            }
            Some(expected) => {
                let next = expected
                    .checked_add(1)
                    .ok_or_else(|| StorageError::Serialization("revision overflow".into()))?;
                let res = sqlx::query(
                    r"
                    UPDATE progress SET
                        status = ?3,
                        score = ?4,
                        attempts = ?5,
                        time_spent_secs = ?6,
                        completed_at = ?7,
                        updated_at = ?8,
                        revision = ?9
                    WHERE learner_id = ?1 AND lesson_id = ?2 AND revision = ?10
                    ",
                )
                .bind(learner_id)
                .bind(lesson_id)
                .bind(record.status().as_str())
                .bind(score)
                .bind(attempts)
                .bind(time_spent)
                .bind(record.completed_at())
                .bind(record.updated_at())
                .bind(u64_to_i64("revision", next)?)
                .bind(u64_to_i64("revision", expected)?)
                .execute(&self.pool)
                .await
                .map_err(conn)?;
                (res, next)
            }
        };

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(revision)
    }
}
