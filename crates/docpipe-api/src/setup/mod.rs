//! Application wiring: database pool, stores, services, and routes.

pub mod routes;
pub mod server;

use crate::state::AppState;
use axum::Router;
use docpipe_core::AppConfig;
use docpipe_db::{
    AnalysisJobRepository, DocumentRepository, PgAnalysisJobRepository, PgDocumentRepository,
};
use docpipe_services::{AnalysisService, ChunkAssembler, HttpAnalysisClient};
use docpipe_storage::{ArtifactStore, ChunkStore, LocalArtifactStore, LocalChunkStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

const DB_MAX_CONNECTIONS: u32 = 20;
const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Build the application state and router against Postgres and the local
/// filesystem stores.
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(DB_ACQUIRE_TIMEOUT_SECS))
        .connect(&config.database_url)
        .await?;

    docpipe_db::run_migrations(&pool).await?;
    tracing::info!("Database pool established");

    let chunks: Arc<dyn ChunkStore> = Arc::new(LocalChunkStore::new(config.chunk_dir.clone()).await?);
    let artifacts: Arc<dyn ArtifactStore> =
        Arc::new(LocalArtifactStore::new(config.files_dir.clone()).await?);

    let documents: Arc<dyn DocumentRepository> = Arc::new(PgDocumentRepository::new(pool.clone()));
    let jobs: Arc<dyn AnalysisJobRepository> = Arc::new(PgAnalysisJobRepository::new(pool));

    let client = Arc::new(HttpAnalysisClient::new(
        config.analysis_base_url.clone(),
        Duration::from_secs(config.analysis_timeout_secs),
    )?);

    let assembler = Arc::new(ChunkAssembler::new(
        chunks,
        artifacts.clone(),
        documents.clone(),
    ));
    let analysis = Arc::new(AnalysisService::new(
        jobs.clone(),
        documents.clone(),
        client,
    ));

    let state = Arc::new(AppState {
        documents,
        jobs,
        artifacts,
        assembler,
        analysis,
        config,
    });

    let router = routes::build_router(state.clone())?;

    Ok((state, router))
}
