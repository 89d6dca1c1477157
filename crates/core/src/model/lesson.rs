use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{ids::LessonId, level::Level};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson {0} lists itself as a prerequisite")]
    SelfPrerequisite(LessonId),

    #[error("lesson {lesson} lists prerequisite {prerequisite} more than once")]
    DuplicatePrerequisite {
        lesson: LessonId,
        prerequisite: LessonId,
    },

    #[error("unknown lesson type {0:?}")]
    UnknownType(String),
}

//
// ─── LESSON TYPE ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Vocabulary,
    Grammar,
    Listening,
    Speaking,
}

impl LessonType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonType::Vocabulary => "vocabulary",
            LessonType::Grammar => "grammar",
            LessonType::Listening => "listening",
            LessonType::Speaking => "speaking",
        }
    }
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonType {
    type Err = LessonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vocabulary" => Ok(Self::Vocabulary),
            "grammar" => Ok(Self::Grammar),
            "listening" => Ok(Self::Listening),
            "speaking" => Ok(Self::Speaking),
            _ => Err(LessonError::UnknownType(s.to_owned())),
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Published lesson metadata the engine reasons over.
///
/// Lessons are immutable once built; the catalog collaborator owns them.
/// Prerequisite order is preserved as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    id: LessonId,
    title: String,
    level: Level,
    lesson_type: LessonType,
    prerequisites: Vec<LessonId>,
    content_ref: String,
    difficulty: u32,
    estimated_minutes: u32,
}

impl Lesson {
    /// Creates a lesson, checking the invariants that can be verified locally.
    ///
    /// Graph-wide invariants (dangling prerequisites, cycles) are checked when
    /// the lesson joins a [`crate::catalog::Catalog`].
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the title is blank or the prerequisite list
    /// contains the lesson itself or a repeated id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        level: Level,
        lesson_type: LessonType,
        prerequisites: Vec<LessonId>,
        content_ref: impl Into<String>,
        difficulty: u32,
        estimated_minutes: u32,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(prerequisites.len());
        for prerequisite in &prerequisites {
            if *prerequisite == id {
                return Err(LessonError::SelfPrerequisite(id));
            }
            if !seen.insert(*prerequisite) {
                return Err(LessonError::DuplicatePrerequisite {
                    lesson: id,
                    prerequisite: *prerequisite,
                });
            }
        }

        Ok(Self {
            id,
            title,
            level,
            lesson_type,
            prerequisites,
            content_ref: content_ref.into(),
            difficulty,
            estimated_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn lesson_type(&self) -> LessonType {
        self.lesson_type
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[LessonId] {
        &self.prerequisites
    }

    #[must_use]
    pub fn content_ref(&self) -> &str {
        &self.content_ref
    }

    #[must_use]
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    #[must_use]
    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
