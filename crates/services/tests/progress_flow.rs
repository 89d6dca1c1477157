use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use progression_core::ErrorKind;
use progression_core::model::{
    Learner, LearnerId, Lesson, LessonId, LessonType, Level, ProgressRecord, ProgressStatus,
};
use progression_core::time::{fixed_clock, fixed_now};
use services::{AppServices, Clock, ProgressSubmission, ServiceConfig, ServiceError};
use storage::repository::{
    InMemoryRepository, ProgressRepository, Storage, StorageError, VersionedProgress,
};

const LEARNER: LearnerId = LearnerId::new(7);

fn lesson(id: u64, level: Level, prerequisites: &[u64], difficulty: u32) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        format!("Lesson {id}"),
        level,
        LessonType::Vocabulary,
        prerequisites.iter().copied().map(LessonId::new).collect(),
        format!("lessons/{id}.json"),
        difficulty,
        15,
    )
    .unwrap()
}

async fn storage_with(level: Level, lessons: &[Lesson]) -> Storage {
    let storage = Storage::in_memory();
    for lesson in lessons {
        storage.lessons.upsert_lesson(lesson).await.unwrap();
    }
    storage
        .learners
        .upsert_learner(&Learner::new(LEARNER, level, Level::B2))
        .await
        .unwrap();
    storage
}

fn submit(lesson: u64, status: ProgressStatus, score: Option<i64>, secs: i64) -> ProgressSubmission {
    ProgressSubmission {
        learner_id: LEARNER,
        lesson_id: LessonId::new(lesson),
        status,
        score,
        time_spent_secs: secs,
    }
}

#[tokio::test]
async fn repeated_completion_accumulates_without_moving_completed_at() {
    let storage = storage_with(Level::A1, &[lesson(1, Level::A1, &[], 1)]).await;
    let app = AppServices::from_storage(storage, fixed_clock(), ServiceConfig::default());

    let first = app
        .progress()
        .submit(submit(1, ProgressStatus::Completed, Some(85), 900))
        .await
        .unwrap();
    assert_eq!(first.status(), ProgressStatus::Completed);
    assert_eq!(first.score(), Some(85));
    assert_eq!(first.attempts(), 1);
    assert_eq!(first.completed_at(), Some(fixed_now()));

    let later = Clock::fixed(fixed_now() + chrono::Duration::hours(2));
    let progress = app.progress().as_ref().clone().with_clock(later);
    let second = progress
        .submit(submit(1, ProgressStatus::Completed, Some(90), 300))
        .await
        .unwrap();
    assert_eq!(second.attempts(), 2);
    assert_eq!(second.score(), Some(90));
    assert_eq!(second.time_spent_secs(), 1200);
    assert_eq!(second.completed_at(), Some(fixed_now()));
    assert_eq!(second.updated_at(), later.now());
}

#[tokio::test]
async fn prerequisites_unlock_after_completion() {
    let storage = storage_with(
        Level::A2,
        &[lesson(1, Level::A1, &[], 1), lesson(2, Level::A2, &[1], 2)],
    )
    .await;
    let app = AppServices::from_storage(storage, fixed_clock(), ServiceConfig::default());

    app.progress()
        .submit(submit(1, ProgressStatus::InProgress, None, 120))
        .await
        .unwrap();
    let err = app
        .progress()
        .submit(submit(2, ProgressStatus::InProgress, None, 60))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::AccessDenied));

    app.progress()
        .submit(submit(1, ProgressStatus::Completed, Some(70), 60))
        .await
        .unwrap();
    let unlocked = app
        .progress()
        .submit(submit(2, ProgressStatus::InProgress, None, 60))
        .await
        .unwrap();
    assert_eq!(unlocked.attempts(), 1);
}

#[tokio::test]
async fn level_gate_blocks_higher_lessons() {
    let storage = storage_with(Level::A1, &[lesson(5, Level::A2, &[], 1)]).await;
    let app = AppServices::from_storage(storage, fixed_clock(), ServiceConfig::default());

    let err = app
        .progress()
        .submit(submit(5, ProgressStatus::InProgress, None, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { lesson, .. } if lesson == LessonId::new(5)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn summary_counts_accessible_lessons_only() {
    let storage = storage_with(
        Level::A1,
        &[
            lesson(1, Level::A1, &[], 1),
            lesson(2, Level::A1, &[], 2),
            lesson(3, Level::A1, &[], 3),
            lesson(4, Level::B1, &[], 4),
        ],
    )
    .await;
    let app = AppServices::from_storage(storage, fixed_clock(), ServiceConfig::default());

    for id in [1, 2] {
        app.progress()
            .submit(submit(id, ProgressStatus::Completed, Some(80), 100))
            .await
            .unwrap();
    }

    let overview = app.progress().overview(LEARNER).await.unwrap();
    assert_eq!(overview.summary.total_lessons, 3);
    assert_eq!(overview.summary.completed_lessons, 2);
    assert!((overview.summary.completion_percentage - 66.7).abs() < f64::EPSILON);
    assert_eq!(overview.summary.time_spent_secs, 200);

    let titles: Vec<_> = overview.details.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Lesson 1", "Lesson 2"]);

    let again = app.progress().overview(LEARNER).await.unwrap();
    assert_eq!(again, overview);
}

#[tokio::test]
async fn recommendations_skip_mastered_and_order_by_difficulty() {
    let storage = storage_with(
        Level::A2,
        &[
            lesson(1, Level::A1, &[], 3),
            lesson(2, Level::A1, &[], 1),
            lesson(3, Level::A2, &[], 1),
            lesson(4, Level::A2, &[9], 1),
        ],
    )
    .await;
    // Lesson 4 names a prerequisite nobody defined.
    let app = AppServices::from_storage(storage.clone(), fixed_clock(), ServiceConfig::default());
    let err = app.progress().recommendations(LEARNER, None).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::DataIntegrity));
    assert!(!err.is_client_error());

    storage
        .lessons
        .upsert_lesson(&lesson(4, Level::A2, &[], 1))
        .await
        .unwrap();
    for status in [ProgressStatus::Completed, ProgressStatus::Mastered] {
        app.progress()
            .submit(submit(2, status, Some(100), 30))
            .await
            .unwrap();
    }

    let picked = app.progress().recommendations(LEARNER, Some(2)).await.unwrap();
    let ids: Vec<_> = picked.iter().map(|l| l.id().value()).collect();
    assert_eq!(ids, vec![3, 4]);
}

#[tokio::test]
async fn mastery_requires_a_prior_completion() {
    let storage = storage_with(Level::A1, &[lesson(1, Level::A1, &[], 1)]).await;
    let app = AppServices::from_storage(storage, fixed_clock(), ServiceConfig::default());

    let err = app
        .progress()
        .submit(submit(1, ProgressStatus::Mastered, Some(100), 10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

    let err = app
        .progress()
        .submit(submit(1, ProgressStatus::NotStarted, None, 10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_each_count_once() {
    const WRITERS: u32 = 16;

    let storage = storage_with(Level::A1, &[lesson(1, Level::A1, &[], 1)]).await;
    let config = ServiceConfig {
        max_write_retries: 64,
        ..ServiceConfig::default()
    };
    let app = AppServices::from_storage(storage, fixed_clock(), config);

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let progress = app.progress();
        handles.push(tokio::spawn(async move {
            progress
                .submit(submit(1, ProgressStatus::InProgress, None, 10))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let overview = app.progress().overview(LEARNER).await.unwrap();
    assert_eq!(overview.details[0].attempts, WRITERS);
    assert_eq!(overview.details[0].time_spent_secs, u64::from(WRITERS) * 10);
}

/// Loses every compare-and-swap.
struct AlwaysConflicting {
    inner: InMemoryRepository,
    saves: AtomicU32,
}

#[async_trait]
impl ProgressRepository for AlwaysConflicting {
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        self.inner.get_progress(learner_id, lesson_id).await
    }

    async fn list_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.inner.list_progress(learner_id).await
    }

    async fn save_progress(
        &self,
        _record: &ProgressRecord,
        _expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Conflict)
    }
}

#[tokio::test]
async fn contention_gives_up_after_configured_retries() {
    let mut storage = storage_with(Level::A1, &[lesson(1, Level::A1, &[], 1)]).await;
    let conflicting = Arc::new(AlwaysConflicting {
        inner: InMemoryRepository::new(),
        saves: AtomicU32::new(0),
    });
    storage.progress = Arc::clone(&conflicting) as Arc<dyn ProgressRepository>;
    let config = ServiceConfig {
        max_write_retries: 2,
        ..ServiceConfig::default()
    };
    let app = AppServices::from_storage(storage, fixed_clock(), config);

    let err = app
        .progress()
        .submit(submit(1, ProgressStatus::InProgress, None, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::WriteContention { tries: 3, .. }));
    assert!(!err.is_client_error());
    assert_eq!(conflicting.saves.load(Ordering::SeqCst), 3);
}
