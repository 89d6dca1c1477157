//! Lesson gating.
//!
//! A lesson is accessible when both gates pass:
//! - level: the lesson's tier is at or below the learner's current tier;
//! - prerequisites: every prerequisite is completed or mastered.
//!
//! The two gates are evaluated independently and combined with a logical AND.

use std::fmt;

use serde::Serialize;

use crate::catalog::{Catalog, CatalogError};
use crate::model::{Learner, Lesson, LessonId, Level, ProgressIndex};

/// Outcome of evaluating both gates for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Granted,
    LevelLocked { required: Level, current: Level },
    PrerequisitesPending { missing: Vec<LessonId> },
}

impl AccessDecision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDecision::Granted => f.write_str("granted"),
            AccessDecision::LevelLocked { required, current } => {
                write!(f, "requires level {required}, learner is at {current}")
            }
            AccessDecision::PrerequisitesPending { missing } => {
                f.write_str("prerequisites not finished:")?;
                for id in missing {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
        }
    }
}

/// Evaluate the level and prerequisite gates for `lesson`.
///
/// The level gate is reported first: a lesson above the learner's tier is
/// `LevelLocked` whatever the prerequisite state.
///
/// # Errors
///
/// Returns `CatalogError::UnknownPrerequisite` if the lesson names a
/// prerequisite the catalog does not contain.
pub fn evaluate(
    learner: &Learner,
    lesson: &Lesson,
    catalog: &Catalog,
    progress: &ProgressIndex,
) -> Result<AccessDecision, CatalogError> {
    if let Some(dangling) = lesson
        .prerequisites()
        .iter()
        .find(|p| !catalog.contains(**p))
    {
        return Err(CatalogError::UnknownPrerequisite {
            lesson: lesson.id(),
            prerequisite: *dangling,
        });
    }

    if !learner.current_level().admits(lesson.level()) {
        return Ok(AccessDecision::LevelLocked {
            required: lesson.level(),
            current: learner.current_level(),
        });
    }

    let missing: Vec<LessonId> = lesson
        .prerequisites()
        .iter()
        .copied()
        .filter(|p| !progress.status(*p).is_finished())
        .collect();

    if missing.is_empty() {
        Ok(AccessDecision::Granted)
    } else {
        Ok(AccessDecision::PrerequisitesPending { missing })
    }
}

/// Pure predicate form of [`evaluate`].
///
/// # Errors
///
/// Returns `CatalogError` when the lesson references an unknown prerequisite.
pub fn is_accessible(
    learner: &Learner,
    lesson: &Lesson,
    catalog: &Catalog,
    progress: &ProgressIndex,
) -> Result<bool, CatalogError> {
    evaluate(learner, lesson, catalog, progress).map(|d| d.is_granted())
}

/// Every catalog lesson currently accessible to the learner, ordered by id.
///
/// # Errors
///
/// Returns `CatalogError` when any lesson references an unknown prerequisite.
pub fn accessible_lessons<'c>(
    learner: &Learner,
    catalog: &'c Catalog,
    progress: &ProgressIndex,
) -> Result<Vec<&'c Lesson>, CatalogError> {
    let mut out = Vec::new();
    for lesson in catalog.iter() {
        if is_accessible(learner, lesson, catalog, progress)? {
            out.push(lesson);
        }
    }
    Ok(out)
}
