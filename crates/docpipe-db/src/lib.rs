//! Database repositories for the data access layer.
//!
//! One narrow repository trait per entity (documents, analysis jobs), each
//! with a Postgres implementation for production and an in-memory
//! implementation for tests and single-process runs.

pub mod analysis;
pub mod document;
pub mod memory;

pub use analysis::{AnalysisJobRepository, PgAnalysisJobRepository};
pub use document::{DocumentRepository, PgDocumentRepository};
pub use memory::{InMemoryAnalysisJobRepository, InMemoryDocumentRepository};

use docpipe_core::AppError;
use sqlx::PgPool;

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
