use std::collections::BTreeMap;

use progression_core::model::{Lesson, LessonId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, lesson_id_from_i64, lesson_id_to_i64, map_lesson_row, ser};
use crate::repository::{LessonRepository, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let id = lesson_id_to_i64(lesson.id())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO lessons (id, title, level, lesson_type, content_ref, difficulty, estimated_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                level = excluded.level,
                lesson_type = excluded.lesson_type,
                content_ref = excluded.content_ref,
                difficulty = excluded.difficulty,
                estimated_minutes = excluded.estimated_minutes
            ",
        )
        .bind(id)
        .bind(lesson.title())
        .bind(lesson.level().as_str())
        .bind(lesson.lesson_type().as_str())
        .bind(lesson.content_ref())
        .bind(i64::from(lesson.difficulty()))
        .bind(i64::from(lesson.estimated_minutes()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM lesson_prerequisites WHERE lesson_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, prerequisite) in lesson.prerequisites().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO lesson_prerequisites (lesson_id, prerequisite_id, position)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(id)
            .bind(lesson_id_to_i64(*prerequisite)?)
            .bind(i64::try_from(position).map_err(ser)?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let raw_id = lesson_id_to_i64(id)?;
        let row = sqlx::query(
            r"
            SELECT id, title, level, lesson_type, content_ref, difficulty, estimated_minutes
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let edge_rows = sqlx::query(
            r"
            SELECT prerequisite_id FROM lesson_prerequisites
            WHERE lesson_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut prerequisites = Vec::with_capacity(edge_rows.len());
        for edge in edge_rows {
            prerequisites.push(lesson_id_from_i64(
                edge.try_get::<i64, _>("prerequisite_id").map_err(ser)?,
            )?);
        }

        map_lesson_row(&row, prerequisites).map(Some)
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let edge_rows = sqlx::query(
            r"
            SELECT lesson_id, prerequisite_id FROM lesson_prerequisites
            ORDER BY lesson_id ASC, position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut edges: BTreeMap<LessonId, Vec<LessonId>> = BTreeMap::new();
        for edge in edge_rows {
            let lesson = lesson_id_from_i64(edge.try_get::<i64, _>("lesson_id").map_err(ser)?)?;
            let prerequisite =
                lesson_id_from_i64(edge.try_get::<i64, _>("prerequisite_id").map_err(ser)?)?;
            edges.entry(lesson).or_default().push(prerequisite);
        }

        let rows = sqlx::query(
            r"
            SELECT id, title, level, lesson_type, content_ref, difficulty, estimated_minutes
            FROM lessons
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            let id = lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
            let prerequisites = edges.remove(&id).unwrap_or_default();
            lessons.push(map_lesson_row(&row, prerequisites)?);
        }
        Ok(lessons)
    }
}
