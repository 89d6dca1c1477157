#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod lesson_service;
pub mod progress_service;
mod snapshot;

pub use progression_core::Clock;

pub use app_services::AppServices;
pub use config::ServiceConfig;
pub use error::{AppServicesError, ServiceError};
pub use lesson_service::{LessonDetail, LessonFilter, LessonListing, LessonService};
pub use progress_service::{ProgressDetail, ProgressOverview, ProgressService, ProgressSubmission};
