mod ids;
mod learner;
mod lesson;
mod level;
mod progress;
mod quiz;

pub use ids::{LearnerId, LessonId, ParseIdError, QuizId};
pub use learner::Learner;
pub use lesson::{Lesson, LessonError, LessonType};
pub use level::{Level, LevelError};
pub use progress::{MAX_SCORE, ProgressError, ProgressIndex, ProgressRecord, ProgressStatus};
pub use quiz::{DEFAULT_QUIZ_WEIGHT, MAX_QUIZ_WEIGHT, QuestionType, Quiz, QuizError};
