use progression_core::model::{Learner, LearnerId};

use super::SqliteRepository;
use super::mapping::{conn, learner_id_to_i64, map_learner_row};
use crate::repository::{LearnerRepository, StorageError};

#[async_trait::async_trait]
impl LearnerRepository for SqliteRepository {
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learners (id, current_level, target_level)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                current_level = excluded.current_level,
                target_level = excluded.target_level
            ",
        )
        .bind(learner_id_to_i64(learner.id())?)
        .bind(learner.current_level().as_str())
        .bind(learner.target_level().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, current_level, target_level
            FROM learners WHERE id = ?1
            ",
        )
        .bind(learner_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_learner_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
