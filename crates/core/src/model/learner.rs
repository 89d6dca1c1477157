use serde::Serialize;

use crate::model::{ids::LearnerId, level::Level};

/// Learner profile as supplied by the identity collaborator.
///
/// `current_level` is authoritative input; the engine reads it but never
/// changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Learner {
    id: LearnerId,
    current_level: Level,
    target_level: Level,
}

impl Learner {
    #[must_use]
    pub fn new(id: LearnerId, current_level: Level, target_level: Level) -> Self {
        Self {
            id,
            current_level,
            target_level,
        }
    }

    /// New learners start at A1 aiming for B2.
    #[must_use]
    pub fn beginner(id: LearnerId) -> Self {
        Self::new(id, Level::A1, Level::B2)
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn current_level(&self) -> Level {
        self.current_level
    }

    #[must_use]
    pub fn target_level(&self) -> Level {
        self.target_level
    }

    /// True once the current tier has reached the target tier.
    #[must_use]
    pub fn has_reached_target(&self) -> bool {
        self.current_level >= self.target_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beginner_defaults() {
        let learner = Learner::beginner(LearnerId::new(7));
        assert_eq!(learner.current_level(), Level::A1);
        assert_eq!(learner.target_level(), Level::B2);
        assert!(!learner.has_reached_target());
    }

    #[test]
    fn reached_target_compares_tiers() {
        let learner = Learner::new(LearnerId::new(1), Level::C1, Level::B2);
        assert!(learner.has_reached_target());
    }
}
