//! In-memory repository implementations.
//!
//! Backing store for tests and single-process development runs, mirroring
//! the Postgres implementations' semantics (scoping, ordering, timestamps).

use async_trait::async_trait;
use chrono::Utc;
use docpipe_core::models::{
    AnalysisJob, AnalysisStatus, Document, DocumentStatus, NewAnalysisJob, NewDocument,
};
use docpipe_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analysis::AnalysisJobRepository;
use crate::document::DocumentRepository;

#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    rows: Arc<RwLock<HashMap<Uuid, Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(doc: &Document, owner_scope: Option<Uuid>) -> bool {
    owner_scope.is_none_or(|owner| doc.owner == owner)
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, doc: NewDocument) -> Result<Document, AppError> {
        let now = Utc::now();
        let row = Document {
            id: Uuid::new_v4(),
            unified_id: doc.unified_id,
            owner: doc.owner,
            file_name: doc.file_name,
            actual_file_name: doc.actual_file_name,
            file_path: doc.file_path,
            file_size: doc.file_size,
            file_type: doc.file_type,
            status: DocumentStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .filter(|doc| in_scope(doc, owner_scope))
            .cloned())
    }

    async fn find_active_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .filter(|doc| doc.status == DocumentStatus::Active && in_scope(doc, owner_scope))
            .cloned())
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
        owner_scope: Option<Uuid>,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Document> = rows
            .values()
            .filter(|doc| in_scope(doc, owner_scope))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let count = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page, count))
    }

    async fn set_status(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        let mut rows = self.rows.write().await;
        let Some(doc) = rows.get_mut(&id).filter(|doc| in_scope(doc, owner_scope)) else {
            return Ok(None);
        };
        doc.status = status;
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, id: Uuid, owner_scope: Option<Uuid>) -> Result<bool, AppError> {
        let mut rows = self.rows.write().await;
        let removable = rows
            .get(&id)
            .is_some_and(|doc| in_scope(doc, owner_scope));
        if removable {
            rows.remove(&id);
        }
        Ok(removable)
    }

    async fn find_active_by_unified_id(
        &self,
        unified_id: Uuid,
    ) -> Result<Vec<Document>, AppError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Document> = rows
            .values()
            .filter(|doc| doc.unified_id == unified_id && doc.status == DocumentStatus::Active)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAnalysisJobRepository {
    // Insertion order doubles as creation order for latest-job lookups.
    rows: Arc<RwLock<Vec<AnalysisJob>>>,
}

impl InMemoryAnalysisJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisJobRepository for InMemoryAnalysisJobRepository {
    async fn create(&self, job: NewAnalysisJob) -> Result<AnalysisJob, AppError> {
        let now = Utc::now();
        let row = AnalysisJob {
            id: Uuid::new_v4(),
            request_id: job.request_id,
            request: job.request,
            response: None,
            status: AnalysisStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn find_latest_non_failed(
        &self,
        request_id: Uuid,
    ) -> Result<Option<AnalysisJob>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .find(|job| job.request_id == request_id && job.status != AnalysisStatus::Fail)
            .cloned())
    }

    async fn find_success(&self, request_id: Uuid) -> Result<Option<AnalysisJob>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .find(|job| job.request_id == request_id && job.status == AnalysisStatus::Success)
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        response: Option<serde_json::Value>,
    ) -> Result<AnalysisJob, AppError> {
        let mut rows = self.rows.write().await;
        let job = rows
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Analysis job not found: {}", id)))?;
        job.status = status;
        if let Some(response) = response {
            job.response = Some(response);
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}
