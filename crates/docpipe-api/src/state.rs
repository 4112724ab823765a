//! Application state shared by all handlers.

use docpipe_core::AppConfig;
use docpipe_db::{AnalysisJobRepository, DocumentRepository};
use docpipe_services::{AnalysisService, ChunkAssembler};
use docpipe_storage::ArtifactStore;
use std::sync::Arc;

/// Aggregated dependencies for dependency injection into handlers.
pub struct AppState {
    pub documents: Arc<dyn DocumentRepository>,
    pub jobs: Arc<dyn AnalysisJobRepository>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub assembler: Arc<ChunkAssembler>,
    pub analysis: Arc<AnalysisService>,
    pub config: AppConfig,
}
