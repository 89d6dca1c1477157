use crate::access;
use crate::catalog::{Catalog, CatalogError};
use crate::model::{Learner, Lesson, ProgressIndex, ProgressStatus};

/// What to study next: accessible lessons that are not yet mastered, easiest
/// first, ties broken by lesson id, truncated to `limit`.
///
/// # Errors
///
/// Returns `CatalogError` when a lesson references an unknown prerequisite.
pub fn recommend<'c>(
    learner: &Learner,
    catalog: &'c Catalog,
    progress: &ProgressIndex,
    limit: usize,
) -> Result<Vec<&'c Lesson>, CatalogError> {
    let mut candidates: Vec<&Lesson> = access::accessible_lessons(learner, catalog, progress)?
        .into_iter()
        .filter(|lesson| progress.status(lesson.id()) != ProgressStatus::Mastered)
        .collect();

    candidates.sort_by_key(|lesson| (lesson.difficulty(), lesson.id()));
    candidates.truncate(limit);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnerId, LessonId, LessonType, Level, ProgressRecord};
    use crate::time::fixed_now;

    fn lesson(id: u64, level: Level, difficulty: u32, prerequisites: &[u64]) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            format!("Lesson {id}"),
            level,
            LessonType::Speaking,
            prerequisites.iter().copied().map(LessonId::new).collect(),
            "",
            difficulty,
            20,
        )
        .unwrap()
    }

    fn ids(lessons: &[&Lesson]) -> Vec<u64> {
        lessons.iter().map(|l| l.id().value()).collect()
    }

    #[test]
    fn orders_by_difficulty_then_id() {
        let learner = Learner::new(LearnerId::new(1), Level::B1, Level::B2);
        let catalog = Catalog::new([
            lesson(4, Level::A1, 2, &[]),
            lesson(2, Level::A1, 3, &[]),
            lesson(3, Level::A2, 2, &[]),
            lesson(1, Level::B1, 5, &[]),
        ])
        .unwrap();
        let progress = ProgressIndex::empty(learner.id());

        let picks = recommend(&learner, &catalog, &progress, 10).unwrap();
        assert_eq!(ids(&picks), vec![3, 4, 2, 1]);
    }

    #[test]
    fn skips_mastered_and_locked_lessons() {
        let learner = Learner::new(LearnerId::new(1), Level::A2, Level::B2);
        let catalog = Catalog::new([
            lesson(1, Level::A1, 1, &[]),
            lesson(2, Level::A1, 2, &[]),
            lesson(3, Level::A2, 3, &[2]),
            lesson(4, Level::B2, 1, &[]),
        ])
        .unwrap();
        let mastered = ProgressRecord::from_persisted(
            learner.id(),
            LessonId::new(1),
            ProgressStatus::Mastered,
            Some(100),
            3,
            600,
            Some(fixed_now()),
            fixed_now(),
            fixed_now(),
        )
        .unwrap();
        let progress = ProgressIndex::from_records(learner.id(), [mastered]).unwrap();

        let picks = recommend(&learner, &catalog, &progress, 10).unwrap();
        assert_eq!(ids(&picks), vec![2]);
    }

    #[test]
    fn truncates_to_limit() {
        let learner = Learner::new(LearnerId::new(1), Level::C2, Level::C2);
        let catalog = Catalog::new((1..=6).map(|id| lesson(id, Level::A1, 1, &[]))).unwrap();
        let progress = ProgressIndex::empty(learner.id());

        let picks = recommend(&learner, &catalog, &progress, 2).unwrap();
        assert_eq!(ids(&picks), vec![1, 2]);
        assert!(recommend(&learner, &catalog, &progress, 0).unwrap().is_empty());
    }
}
