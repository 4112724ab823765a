//! Core domain types for docpipe: models, error taxonomy, and configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::AppConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
