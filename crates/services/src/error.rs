//! Shared error types for the services crate.

use thiserror::Error;

use progression_core::access::AccessDecision;
use progression_core::model::{LearnerId, LessonId, ProgressError};
use progression_core::tracker::{AttemptError, TrackerError};
use progression_core::{CatalogError, ErrorKind};
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `LessonService` and `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error("lesson {lesson} is locked: {decision}")]
    AccessDenied {
        lesson: LessonId,
        decision: AccessDecision,
    },
    #[error("progress for lesson {0} refers to a lesson missing from the catalog")]
    OrphanedProgress(LessonId),
    #[error("gave up on learner {learner} lesson {lesson} after {tries} conflicting writes")]
    WriteContention {
        learner: LearnerId,
        lesson: LessonId,
        tries: u32,
    },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Engine classification, `None` for transport-level storage faults.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::LearnerNotFound(_) | ServiceError::LessonNotFound(_) => {
                Some(ErrorKind::NotFound)
            }
            ServiceError::AccessDenied { .. } => Some(ErrorKind::AccessDenied),
            ServiceError::OrphanedProgress(_)
            | ServiceError::Storage(StorageError::Integrity(_)) => Some(ErrorKind::DataIntegrity),
            ServiceError::Attempt(e) => Some(e.kind()),
            ServiceError::Catalog(e) => Some(e.kind()),
            ServiceError::Progress(e) => Some(e.kind()),
            ServiceError::WriteContention { .. } | ServiceError::Storage(_) => None,
        }
    }

    /// True when the request itself was rejected; false for server-side faults.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_client_error)
    }
}

impl From<TrackerError> for ServiceError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::AccessDenied { lesson, decision } => {
                ServiceError::AccessDenied { lesson, decision }
            }
            TrackerError::Attempt(e) => ServiceError::Attempt(e),
            TrackerError::Catalog(e) => ServiceError::Catalog(e),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}
