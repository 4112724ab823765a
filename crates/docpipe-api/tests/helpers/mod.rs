//! Shared test harness: an in-process server over in-memory repositories,
//! tempdir-backed stores, and a scripted analysis client.

#![allow(dead_code)] // Not every test binary uses every helper

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use docpipe_api::auth::token::issue_token;
use docpipe_api::setup::routes::build_router;
use docpipe_api::state::AppState;
use docpipe_core::models::{Caller, UserRole};
use docpipe_core::AppConfig;
use docpipe_db::{
    AnalysisJobRepository, DocumentRepository, InMemoryAnalysisJobRepository,
    InMemoryDocumentRepository,
};
use docpipe_services::{AnalysisClient, AnalysisClientError, AnalysisService, ChunkAssembler};
use docpipe_storage::{ArtifactStore, ChunkStore, LocalArtifactStore, LocalChunkStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_MAX_CHUNK_SIZE: usize = 1024;

/// Analysis client double: fixed outcome, call counter, last bearer capture.
pub struct ScriptedAnalysisClient {
    calls: AtomicUsize,
    outcome: Mutex<Result<u16, String>>,
    last_bearer: Mutex<Option<String>>,
}

impl ScriptedAnalysisClient {
    pub fn with_status(code: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Mutex::new(Ok(code)),
            last_bearer: Mutex::new(None),
        })
    }

    pub fn set_status(&self, code: u16) {
        *self.outcome.lock().unwrap() = Ok(code);
    }

    pub fn set_transport_failure(&self, message: &str) {
        *self.outcome.lock().unwrap() = Err(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.last_bearer.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalysisClient {
    async fn submit(
        &self,
        _payload: &serde_json::Value,
        bearer: &str,
    ) -> Result<u16, AnalysisClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_bearer.lock().unwrap() = Some(bearer.to_string());
        match self.outcome.lock().unwrap().clone() {
            Ok(code) => Ok(code),
            Err(message) => Err(AnalysisClientError::Transport(message)),
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub documents: Arc<InMemoryDocumentRepository>,
    pub jobs: Arc<InMemoryAnalysisJobRepository>,
    pub analysis_client: Arc<ScriptedAnalysisClient>,
    pub _temp_dir: TempDir,
}

fn test_config(temp_dir: &TempDir) -> AppConfig {
    AppConfig {
        server_port: 0,
        database_url: "postgresql://unused".to_string(),
        chunk_dir: temp_dir.path().join("chunk"),
        files_dir: temp_dir.path().join("files"),
        max_chunk_size_bytes: TEST_MAX_CHUNK_SIZE,
        list_limit_cap: 250,
        analysis_base_url: "http://unused".to_string(),
        analysis_timeout_secs: 10,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiry_hours: 24,
        cors_origins: vec![],
        environment: "test".to_string(),
    }
}

/// Build an app wired to in-memory repositories and a scripted client.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config = test_config(&temp_dir);

    let chunks: Arc<dyn ChunkStore> = Arc::new(
        LocalChunkStore::new(config.chunk_dir.clone())
            .await
            .expect("create chunk store"),
    );
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(
        LocalArtifactStore::new(config.files_dir.clone())
            .await
            .expect("create artifact store"),
    );

    let documents = Arc::new(InMemoryDocumentRepository::new());
    let jobs = Arc::new(InMemoryAnalysisJobRepository::new());
    let analysis_client = ScriptedAnalysisClient::with_status(200);

    let assembler = Arc::new(ChunkAssembler::new(
        chunks,
        artifacts.clone(),
        documents.clone() as Arc<dyn DocumentRepository>,
    ));
    let analysis = Arc::new(AnalysisService::new(
        jobs.clone() as Arc<dyn AnalysisJobRepository>,
        documents.clone() as Arc<dyn DocumentRepository>,
        analysis_client.clone() as Arc<dyn AnalysisClient>,
    ));

    let state = Arc::new(AppState {
        documents: documents.clone() as Arc<dyn DocumentRepository>,
        jobs: jobs.clone() as Arc<dyn AnalysisJobRepository>,
        artifacts,
        assembler,
        analysis,
        config,
    });

    let router = build_router(state).expect("build router");
    let server = TestServer::new(router).expect("start test server");

    TestApp {
        server,
        documents,
        jobs,
        analysis_client,
        _temp_dir: temp_dir,
    }
}

pub fn caller_with_role(role: UserRole) -> Caller {
    Caller {
        user_id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        name: "Test User".to_string(),
        role,
    }
}

pub fn editor() -> Caller {
    caller_with_role(UserRole::Editor)
}

pub fn admin() -> Caller {
    caller_with_role(UserRole::Admin)
}

pub fn viewer() -> Caller {
    caller_with_role(UserRole::Viewer)
}

pub fn bearer(caller: &Caller) -> String {
    let token = issue_token(caller, TEST_JWT_SECRET, 24).expect("sign test token");
    format!("Bearer {}", token)
}

/// POST one chunk with sidecar headers; returns the raw response.
pub async fn upload_chunk(
    app: &TestApp,
    caller: &Caller,
    unified_id: Uuid,
    file_name: &str,
    total_chunks: u32,
    index: u32,
    data: &[u8],
) -> TestResponse {
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(data.to_vec())
            .file_name("blob")
            .mime_type("application/octet-stream"),
    );

    app.server
        .post("/api/v1/documents/chunks")
        .add_header("authorization", bearer(caller))
        .add_header("x-unified-id", unified_id.to_string())
        .add_header("x-file-name", file_name)
        .add_header("x-actual-file-name", "report.pdf")
        .add_header("x-file-size", "0")
        .add_header("x-total-chunks", total_chunks.to_string())
        .add_header("x-chunk-index", index.to_string())
        .multipart(form)
        .await
}

/// Upload a complete single-chunk PDF under `unified_id`.
pub async fn upload_complete_pdf(app: &TestApp, caller: &Caller, unified_id: Uuid) -> TestResponse {
    upload_chunk(
        app,
        caller,
        unified_id,
        &format!("{}.pdf", unified_id),
        1,
        0,
        b"%PDF-1.7 test document",
    )
    .await
}
