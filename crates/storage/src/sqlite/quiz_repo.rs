use progression_core::model::{LessonId, Quiz};
use sqlx::types::Json;

use super::SqliteRepository;
use super::mapping::{conn, lesson_id_to_i64, map_quiz_row, quiz_id_to_i64};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quizzes (
                id, lesson_id, question_text, question_type, correct_answer,
                options, audio_ref, difficulty_weight
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                question_text = excluded.question_text,
                question_type = excluded.question_type,
                correct_answer = excluded.correct_answer,
                options = excluded.options,
                audio_ref = excluded.audio_ref,
                difficulty_weight = excluded.difficulty_weight
            ",
        )
        .bind(quiz_id_to_i64(quiz.id())?)
        .bind(lesson_id_to_i64(quiz.lesson_id())?)
        .bind(quiz.question_text())
        .bind(quiz.question_type().as_str())
        .bind(quiz.correct_answer())
        .bind(Json(quiz.options()))
        .bind(quiz.audio_ref())
        .bind(i64::from(quiz.difficulty_weight()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_quizzes(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, question_text, question_type, correct_answer,
                   options, audio_ref, difficulty_weight
            FROM quizzes
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(lesson_id_to_i64(lesson_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }
}
