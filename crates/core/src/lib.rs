#![forbid(unsafe_code)]

//! Lesson progression engine: level and prerequisite gating, the per-lesson
//! progress state machine, completion analytics and study recommendations.
//!
//! Everything here is a pure function over explicit snapshots ([`Catalog`],
//! [`model::ProgressIndex`]); persistence lives behind the `storage` crate.

pub mod access;
pub mod analytics;
pub mod catalog;
pub mod error;
pub mod model;
pub mod recommend;
pub mod time;
pub mod tracker;

pub use catalog::{Catalog, CatalogError};
pub use error::ErrorKind;
pub use time::Clock;
