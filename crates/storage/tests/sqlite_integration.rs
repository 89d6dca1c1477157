use chrono::Duration;
use progression_core::model::{
    Learner, LearnerId, Lesson, LessonId, LessonType, Level, ProgressRecord, ProgressStatus,
    QuestionType, Quiz, QuizId,
};
use progression_core::time::fixed_now;
use storage::repository::{
    LearnerRepository, LessonRepository, ProgressRepository, QuizRepository, Storage,
    StorageError,
};
use storage::seed::{DEMO_LEARNER_ID, sample_lessons, sample_quizzes, seed_sample_data};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn record(
    lesson: u64,
    status: ProgressStatus,
    score: Option<u8>,
    attempts: u32,
    time_spent_secs: u64,
) -> ProgressRecord {
    let completed_at = status.is_finished().then(fixed_now);
    ProgressRecord::from_persisted(
        DEMO_LEARNER_ID,
        LessonId::new(lesson),
        status,
        score,
        attempts,
        time_spent_secs,
        completed_at,
        fixed_now(),
        fixed_now() + Duration::minutes(i64::from(attempts)),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_lessons_with_ordered_prerequisites() {
    let repo = connect("memdb_lessons").await;

    let lesson = Lesson::new(
        LessonId::new(10),
        "Weather Talk",
        Level::A2,
        LessonType::Listening,
        vec![LessonId::new(3), LessonId::new(1)],
        "lessons/10.json",
        3,
        25,
    )
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    let fetched = repo.get_lesson(LessonId::new(10)).await.unwrap().unwrap();
    assert_eq!(fetched, lesson);
    assert_eq!(fetched.prerequisites(), &[LessonId::new(3), LessonId::new(1)]);

    let edited = Lesson::new(
        LessonId::new(10),
        "Weather Talk",
        Level::A2,
        LessonType::Speaking,
        vec![LessonId::new(1)],
        "lessons/10.json",
        4,
        25,
    )
    .unwrap();
    repo.upsert_lesson(&edited).await.unwrap();

    let listed = repo.list_lessons().await.unwrap();
    assert_eq!(listed, vec![edited]);
    assert!(repo.get_lesson(LessonId::new(11)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_roundtrips_learners() {
    let repo = connect("memdb_learners").await;

    let learner = Learner::new(LearnerId::new(4), Level::B1, Level::C1);
    repo.upsert_learner(&learner).await.unwrap();
    assert_eq!(
        repo.get_learner(LearnerId::new(4)).await.unwrap(),
        Some(learner)
    );

    let promoted = Learner::new(LearnerId::new(4), Level::B2, Level::C1);
    repo.upsert_learner(&promoted).await.unwrap();
    assert_eq!(
        repo.get_learner(LearnerId::new(4)).await.unwrap(),
        Some(promoted)
    );
    assert!(repo.get_learner(LearnerId::new(5)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_progress_writes_are_compare_and_swap() {
    let repo = connect("memdb_progress_cas").await;
    for lesson in sample_lessons().unwrap() {
        repo.upsert_lesson(&lesson).await.unwrap();
    }
    repo.upsert_learner(&Learner::beginner(DEMO_LEARNER_ID))
        .await
        .unwrap();

    let first = record(1, ProgressStatus::Completed, Some(85), 1, 900);
    assert_eq!(repo.save_progress(&first, None).await.unwrap(), 1);

    let err = repo.save_progress(&first, None).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let second = record(1, ProgressStatus::Completed, Some(90), 2, 1200);
    assert_eq!(repo.save_progress(&second, Some(1)).await.unwrap(), 2);

    let err = repo.save_progress(&second, Some(1)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let stored = repo
        .get_progress(DEMO_LEARNER_ID, LessonId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.revision, 2);
    assert_eq!(stored.record, second);
    assert_eq!(stored.record.completed_at(), Some(fixed_now()));
}

#[tokio::test]
async fn sqlite_lists_progress_per_learner_in_lesson_order() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_list?mode=memory&cache=shared")
        .await
        .expect("storage");
    seed_sample_data(&storage).await.unwrap();
    storage
        .learners
        .upsert_learner(&Learner::beginner(LearnerId::new(2)))
        .await
        .unwrap();

    storage
        .progress
        .save_progress(&record(2, ProgressStatus::InProgress, None, 1, 60), None)
        .await
        .unwrap();
    storage
        .progress
        .save_progress(&record(1, ProgressStatus::Mastered, Some(100), 3, 1800), None)
        .await
        .unwrap();

    let other = ProgressRecord::from_persisted(
        LearnerId::new(2),
        LessonId::new(1),
        ProgressStatus::InProgress,
        Some(40),
        1,
        30,
        None,
        fixed_now(),
        fixed_now(),
    )
    .unwrap();
    storage.progress.save_progress(&other, None).await.unwrap();

    let records = storage.progress.list_progress(DEMO_LEARNER_ID).await.unwrap();
    let lessons: Vec<_> = records.iter().map(ProgressRecord::lesson_id).collect();
    assert_eq!(lessons, vec![LessonId::new(1), LessonId::new(2)]);
    assert_eq!(records[0].status(), ProgressStatus::Mastered);
    assert_eq!(records[1].score(), None);
}

#[tokio::test]
async fn sqlite_rejects_progress_for_unknown_lessons() {
    let repo = connect("memdb_progress_fk").await;
    repo.upsert_learner(&Learner::beginner(DEMO_LEARNER_ID))
        .await
        .unwrap();

    let err = repo
        .save_progress(&record(99, ProgressStatus::InProgress, None, 1, 10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));
}

#[tokio::test]
async fn sqlite_rejects_self_referencing_prerequisite_edges() {
    let repo = connect("memdb_self_edge").await;
    for lesson in sample_lessons().unwrap() {
        repo.upsert_lesson(&lesson).await.unwrap();
    }

    let inserted = sqlx::query(
        "INSERT INTO lesson_prerequisites (lesson_id, prerequisite_id, position) VALUES (2, 2, 0)",
    )
    .execute(repo.pool())
    .await;
    assert!(inserted.is_err());
    assert!(
        repo.get_lesson(LessonId::new(2))
            .await
            .unwrap()
            .unwrap()
            .prerequisites()
            .is_empty()
    );
}

#[tokio::test]
async fn sqlite_reports_contradictory_rows_as_integrity_errors() {
    let repo = connect("memdb_bad_rows").await;
    for lesson in sample_lessons().unwrap() {
        repo.upsert_lesson(&lesson).await.unwrap();
    }
    repo.upsert_learner(&Learner::beginner(DEMO_LEARNER_ID))
        .await
        .unwrap();

    // Mastered with no attempts recorded.
    sqlx::query(
        r"
        INSERT INTO progress (
            learner_id, lesson_id, status, score, attempts, time_spent_secs,
            completed_at, created_at, updated_at, revision
        )
        VALUES (1, 2, 'mastered', 95, 0, 0, ?1, ?1, ?1, 1)
        ",
    )
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo
        .get_progress(DEMO_LEARNER_ID, LessonId::new(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)), "{err:?}");
    let err = repo.list_progress(DEMO_LEARNER_ID).await.unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)), "{err:?}");

    sqlx::query("UPDATE lessons SET lesson_type = 'essay' WHERE id = 4")
        .execute(repo.pool())
        .await
        .unwrap();
    let err = repo.list_lessons().await.unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)), "{err:?}");
}

#[tokio::test]
async fn sqlite_roundtrips_quizzes_per_lesson() {
    let repo = connect("memdb_quizzes").await;
    for lesson in sample_lessons().unwrap() {
        repo.upsert_lesson(&lesson).await.unwrap();
    }
    for quiz in sample_quizzes().unwrap() {
        repo.upsert_quiz(&quiz).await.unwrap();
    }

    let listening = Quiz::new(
        QuizId::new(7),
        LessonId::new(2),
        "Write the number you hear",
        QuestionType::Listening,
        "tolv",
        Vec::new(),
        Some("audio/numbers-12.mp3".into()),
        150,
    )
    .unwrap();
    repo.upsert_quiz(&listening).await.unwrap();

    let greetings = repo.list_quizzes(LessonId::new(1)).await.unwrap();
    assert_eq!(greetings, sample_quizzes().unwrap());
    assert_eq!(greetings[0].options(), &["Hei", "Ha det", "Takk", "Unnskyld"]);

    let numbers = repo.list_quizzes(LessonId::new(2)).await.unwrap();
    assert_eq!(numbers, vec![listening]);
    assert_eq!(numbers[0].audio_ref(), Some("audio/numbers-12.mp3"));

    let orphan = Quiz::new(
        QuizId::new(8),
        LessonId::new(99),
        "Orphan",
        QuestionType::FillBlank,
        "x",
        Vec::new(),
        None,
        100,
    )
    .unwrap();
    let err = repo.upsert_quiz(&orphan).await.unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));
}
