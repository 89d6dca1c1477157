use crate::catalog::CatalogError;
use crate::model::{LessonError, LevelError, ProgressError, QuizError};
use crate::tracker::{AttemptError, TrackerError};

/// Coarse classification every engine error maps onto.
///
/// Callers use it to decide between a client-facing rejection and a
/// server-side fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    InvalidInput,
    DataIntegrity,
}

impl ErrorKind {
    /// True for rejections caused by the request rather than by our data.
    #[must_use]
    pub fn is_client_error(self) -> bool {
        !matches!(self, ErrorKind::DataIntegrity)
    }
}

impl CatalogError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DataIntegrity
    }
}

impl LevelError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

impl LessonError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LessonError::UnknownType(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::DataIntegrity,
        }
    }
}

impl QuizError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::UnknownType(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::DataIntegrity,
        }
    }
}

impl ProgressError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressError::UnknownStatus(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::DataIntegrity,
        }
    }
}

impl AttemptError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

impl TrackerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::AccessDenied { .. } => ErrorKind::AccessDenied,
            TrackerError::Attempt(e) => e.kind(),
            TrackerError::Catalog(e) => e.kind(),
        }
    }
}
