#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_service;

pub use progress_core::CourseStats;

pub use app_services::AppServices;
pub use error::{AppServicesError, ProgressServiceError};
pub use progress_service::ProgressService;
