//! Read helpers that turn repository rows into engine snapshots.

use progression_core::{Catalog, ErrorKind};
use progression_core::model::{Learner, LearnerId, ProgressIndex};
use storage::repository::{LearnerRepository, LessonRepository, ProgressRepository};
use tracing::error;

use crate::error::ServiceError;

pub(crate) async fn load_learner(
    learners: &dyn LearnerRepository,
    id: LearnerId,
) -> Result<Learner, ServiceError> {
    learners
        .get_learner(id)
        .await?
        .ok_or(ServiceError::LearnerNotFound(id))
}

/// Build and validate the catalog. A broken graph is a configuration defect.
pub(crate) async fn load_catalog(lessons: &dyn LessonRepository) -> Result<Catalog, ServiceError> {
    let all = lessons.list_lessons().await?;
    Ok(Catalog::new(all)?)
}

pub(crate) async fn load_progress(
    progress: &dyn ProgressRepository,
    learner_id: LearnerId,
) -> Result<ProgressIndex, ServiceError> {
    let records = progress.list_progress(learner_id).await?;
    Ok(ProgressIndex::from_records(learner_id, records)?)
}

/// Log engine integrity faults before handing them back.
pub(crate) fn report(err: ServiceError) -> ServiceError {
    if err.kind() == Some(ErrorKind::DataIntegrity) {
        error!(error = %err, "data integrity fault");
    }
    err
}
