#![forbid(unsafe_code)]

//! Persistence for lessons, quizzes, learner profiles and progress records.
//!
//! Adapters sit behind the traits in [`repository`]; [`repository::Storage`]
//! bundles one backend as trait objects.

pub mod repository;
pub mod seed;
pub mod sqlite;
