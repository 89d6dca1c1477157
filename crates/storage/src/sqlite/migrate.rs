use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Brings the schema up to date, one versioned transaction per step.
///
/// Version 1 creates learners, lessons, prerequisite edges, progress records,
/// and indexes. Version 2 adds lesson quizzes.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS learners (
                    id INTEGER PRIMARY KEY,
                    current_level TEXT NOT NULL
                        CHECK (current_level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    target_level TEXT NOT NULL
                        CHECK (target_level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    level TEXT NOT NULL
                        CHECK (level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    lesson_type TEXT NOT NULL,
                    content_ref TEXT NOT NULL,
                    difficulty INTEGER NOT NULL CHECK (difficulty >= 0),
                    estimated_minutes INTEGER NOT NULL CHECK (estimated_minutes >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Edges are not foreign-keyed on the prerequisite side; the catalog
        // validates them when it is loaded.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_prerequisites (
                    lesson_id INTEGER NOT NULL,
                    prerequisite_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    CHECK (lesson_id <> prerequisite_id),
                    PRIMARY KEY (lesson_id, prerequisite_id),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    learner_id INTEGER NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    status TEXT NOT NULL
                        CHECK (status IN ('not_started', 'in_progress', 'completed', 'mastered')),
                    score INTEGER CHECK (score IS NULL OR score BETWEEN 0 AND 100),
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    completed_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    revision INTEGER NOT NULL CHECK (revision >= 1),
                    PRIMARY KEY (learner_id, lesson_id),
                    FOREIGN KEY (learner_id) REFERENCES learners(id) ON DELETE CASCADE,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_lessons_level_difficulty
                    ON lessons(level, difficulty, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_lesson_status
                    ON progress(lesson_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    // Version 2: quizzes. Options are a JSON array of strings.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    question_text TEXT NOT NULL,
                    question_type TEXT NOT NULL
                        CHECK (question_type IN ('multiple_choice', 'fill_blank', 'speaking', 'listening')),
                    correct_answer TEXT NOT NULL,
                    options TEXT NOT NULL DEFAULT '[]',
                    audio_ref TEXT,
                    difficulty_weight INTEGER NOT NULL DEFAULT 100
                        CHECK (difficulty_weight BETWEEN 0 AND 999),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quizzes_lesson
                    ON quizzes(lesson_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(2_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
