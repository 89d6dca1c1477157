use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a command-line or stored id is not a non-negative integer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{raw:?} is not a valid {kind}")]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

/// Integer-backed id newtype: transparent in JSON, bare number in `Display`,
/// tagged in `Debug`, trimmed on parse.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                    raw: s.to_owned(),
                })
            }
        }
    };
}

integer_id!(
    /// Catalog key of a lesson.
    LessonId
);
integer_id!(
    /// Key of a learner profile.
    LearnerId
);
integer_id!(
    /// Key of a quiz question attached to a lesson.
    QuizId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_number() {
        assert_eq!(LessonId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", QuizId::new(3)), "QuizId(3)");
    }

    #[test]
    fn parse_trims_whitespace() {
        let id: LessonId = " 123 ".parse().unwrap();
        assert_eq!(id, LessonId::new(123));
    }

    #[test]
    fn parse_failure_names_the_id_kind() {
        let err = "abc".parse::<LearnerId>().unwrap_err();
        assert_eq!(err.to_string(), "\"abc\" is not a valid LearnerId");
        assert!("-4".parse::<LessonId>().is_err());
    }

    #[test]
    fn ids_order_numerically() {
        assert!(LessonId::new(2) < LessonId::new(10));
    }
}
