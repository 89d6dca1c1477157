use std::sync::Arc;

use storage::repository::Storage;
use storage::seed::{self, SeedReport};

use crate::Clock;
use crate::config::ServiceConfig;
use crate::error::AppServicesError;
use crate::lesson_service::LessonService;
use crate::progress_service::ProgressService;

/// Assembles caller-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    lessons: Arc<LessonService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: ServiceConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, config))
    }

    /// Build services over an already-open backend.
    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, config: ServiceConfig) -> Self {
        let lessons = Arc::new(LessonService::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.learners),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            config,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.learners),
            Arc::clone(&storage.progress),
        ));

        Self {
            storage,
            lessons,
            progress,
        }
    }

    /// Load the sample catalog with its quizzes, and the demo learner if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if a sample lesson is malformed or a write fails.
    pub async fn seed_sample_data(&self) -> Result<SeedReport, AppServicesError> {
        Ok(seed::seed_sample_data(&self.storage).await?)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
