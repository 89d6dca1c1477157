use chrono::{DateTime, Utc};
use progression_core::model::{
    Learner, LearnerId, Lesson, LessonId, LessonType, Level, ProgressRecord, ProgressStatus,
    QuestionType, Quiz, QuizId,
};
use sqlx::Row;
use sqlx::types::Json;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, VersionedProgress};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn integrity<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Integrity(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn lesson_id_to_i64(id: LessonId) -> Result<i64, StorageError> {
    u64_to_i64("lesson_id", id.value())
}

pub(crate) fn learner_id_to_i64(id: LearnerId) -> Result<i64, StorageError> {
    u64_to_i64("learner_id", id.value())
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn learner_id_from_i64(v: i64) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(i64_to_u64("learner_id", v)?))
}

fn parse_level(field: &'static str, row: &SqliteRow) -> Result<Level, StorageError> {
    let raw: String = row.try_get(field).map_err(ser)?;
    raw.parse::<Level>().map_err(integrity)
}

/// Builds a lesson from its row plus the prerequisite edges loaded separately.
pub(crate) fn map_lesson_row(
    row: &SqliteRow,
    prerequisites: Vec<LessonId>,
) -> Result<Lesson, StorageError> {
    let lesson_type: String = row.try_get("lesson_type").map_err(ser)?;
    let lesson_type = lesson_type.parse::<LessonType>().map_err(integrity)?;

    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        parse_level("level", row)?,
        lesson_type,
        prerequisites,
        row.try_get::<String, _>("content_ref").map_err(ser)?,
        i64_to_u32("difficulty", row.try_get::<i64, _>("difficulty").map_err(ser)?)?,
        i64_to_u32(
            "estimated_minutes",
            row.try_get::<i64, _>("estimated_minutes").map_err(ser)?,
        )?,
    )
    .map_err(integrity)
}

pub(crate) fn map_learner_row(row: &SqliteRow) -> Result<Learner, StorageError> {
    Ok(Learner::new(
        learner_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        parse_level("current_level", row)?,
        parse_level("target_level", row)?,
    ))
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let status = status.parse::<ProgressStatus>().map_err(integrity)?;

    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|s| {
            u8::try_from(s).map_err(|_| StorageError::Integrity(format!("invalid score: {s}")))
        })
        .transpose()?;

    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    ProgressRecord::from_persisted(
        learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        status,
        score,
        i64_to_u32("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        i64_to_u64(
            "time_spent_secs",
            row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
        )?,
        completed_at,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(integrity)
}

pub(crate) fn quiz_id_to_i64(id: QuizId) -> Result<i64, StorageError> {
    u64_to_i64("quiz_id", id.value())
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let question_type: String = row.try_get("question_type").map_err(ser)?;
    let question_type = question_type.parse::<QuestionType>().map_err(integrity)?;
    let Json(options): Json<Vec<String>> = row.try_get("options").map_err(ser)?;
    let weight: i64 = row.try_get("difficulty_weight").map_err(ser)?;
    let weight = u16::try_from(weight)
        .map_err(|_| StorageError::Integrity(format!("invalid difficulty_weight: {weight}")))?;

    Quiz::new(
        QuizId::new(i64_to_u64("quiz_id", row.try_get::<i64, _>("id").map_err(ser)?)?),
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get::<String, _>("question_text").map_err(ser)?,
        question_type,
        row.try_get::<String, _>("correct_answer").map_err(ser)?,
        options,
        row.try_get::<Option<String>, _>("audio_ref").map_err(ser)?,
        weight,
    )
    .map_err(integrity)
}

pub(crate) fn map_versioned_progress_row(
    row: &SqliteRow,
) -> Result<VersionedProgress, StorageError> {
    let record = map_progress_row(row)?;
    let revision = i64_to_u64("revision", row.try_get::<i64, _>("revision").map_err(ser)?)?;
    Ok(VersionedProgress { record, revision })
}
