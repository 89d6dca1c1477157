use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::{Lesson, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// The lesson graph is malformed. These are configuration faults, not bad requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson {0} appears more than once in the catalog")]
    DuplicateLesson(LessonId),

    #[error("lesson {lesson} requires unknown lesson {prerequisite}")]
    UnknownPrerequisite {
        lesson: LessonId,
        prerequisite: LessonId,
    },

    #[error("prerequisite cycle through lessons {lessons:?}")]
    Cycle { lessons: Vec<LessonId> },
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only, validated snapshot of published lessons.
///
/// Building a catalog proves that every prerequisite resolves and that the
/// prerequisite graph is acyclic.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    lessons: BTreeMap<LessonId, Lesson>,
}

impl Catalog {
    /// Validate and index the given lessons.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for duplicate ids, dangling prerequisites, or cycles.
    pub fn new(lessons: impl IntoIterator<Item = Lesson>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();
        for lesson in lessons {
            let id = lesson.id();
            if by_id.insert(id, lesson).is_some() {
                return Err(CatalogError::DuplicateLesson(id));
            }
        }

        for lesson in by_id.values() {
            if let Some(missing) = lesson
                .prerequisites()
                .iter()
                .find(|p| !by_id.contains_key(p))
            {
                return Err(CatalogError::UnknownPrerequisite {
                    lesson: lesson.id(),
                    prerequisite: *missing,
                });
            }
        }

        check_acyclic(&by_id)?;

        Ok(Self { lessons: by_id })
    }

    #[must_use]
    pub fn get(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: LessonId) -> bool {
        self.lessons.contains_key(&id)
    }

    /// Lessons ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

/// Kahn's algorithm over prerequisite edges; whatever never reaches in-degree
/// zero sits on (or behind) a cycle.
fn check_acyclic(lessons: &BTreeMap<LessonId, Lesson>) -> Result<(), CatalogError> {
    let mut in_degree: BTreeMap<LessonId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<LessonId, Vec<LessonId>> = BTreeMap::new();

    for lesson in lessons.values() {
        in_degree.insert(lesson.id(), lesson.prerequisites().len());
        for prerequisite in lesson.prerequisites() {
            dependents
                .entry(*prerequisite)
                .or_default()
                .push(lesson.id());
        }
    }

    let mut ready: BTreeSet<LessonId> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut visited = 0usize;

    while let Some(id) = ready.pop_first() {
        visited += 1;
        for dependent in dependents.get(&id).into_iter().flatten() {
            let Some(deg) = in_degree.get_mut(dependent) else {
                continue;
            };
            *deg = deg.saturating_sub(1);
            if *deg == 0 {
                ready.insert(*dependent);
            }
        }
    }

    if visited == lessons.len() {
        return Ok(());
    }

    let lessons = in_degree
        .into_iter()
        .filter(|(_, deg)| *deg > 0)
        .map(|(id, _)| id)
        .collect();
    Err(CatalogError::Cycle { lessons })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
