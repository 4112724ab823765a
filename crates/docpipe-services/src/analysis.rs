//! Analysis job lifecycle.
//!
//! Owns the state machine for one analysis job per logical request id:
//! submission to the external service, idempotent webhook application, and
//! result retrieval.

use docpipe_core::models::{
    AnalysisJob, AnalysisStatus, Caller, Document, NewAnalysisJob,
};
use docpipe_core::AppError;
use docpipe_db::{AnalysisJobRepository, DocumentRepository};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::claims::KeyedLock;
use crate::client::AnalysisClient;

/// A finished analysis joined with the ACTIVE documents of its request.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub job: AnalysisJob,
    pub documents: Vec<Document>,
}

pub struct AnalysisService {
    jobs: Arc<dyn AnalysisJobRepository>,
    documents: Arc<dyn DocumentRepository>,
    client: Arc<dyn AnalysisClient>,
    submissions: KeyedLock,
}

impl AnalysisService {
    pub fn new(
        jobs: Arc<dyn AnalysisJobRepository>,
        documents: Arc<dyn DocumentRepository>,
        client: Arc<dyn AnalysisClient>,
    ) -> Self {
        Self {
            jobs,
            documents,
            client,
            submissions: KeyedLock::new(),
        }
    }

    /// Submit a request for analysis.
    ///
    /// Resubmission of a request that already has a PENDING/ACK/SUCCESS job
    /// returns that job unchanged without a second external call. Concurrent
    /// submissions of the same request id serialize on a per-id lock, so the
    /// loser observes the winner's row through the same guard.
    pub async fn submit(
        &self,
        request_id: Uuid,
        caller: &Caller,
        bearer: &str,
    ) -> Result<AnalysisJob, AppError> {
        let _guard = self.submissions.acquire(request_id).await;

        tracing::info!(request_id = %request_id, "Analysis submission started");

        if let Some(existing) = self.jobs.find_latest_non_failed(request_id).await? {
            tracing::info!(
                request_id = %request_id,
                status = %existing.status,
                "Analysis already recorded for request, returning existing job"
            );
            return Ok(existing);
        }

        let documents = self.documents.find_active_by_unified_id(request_id).await?;
        let Some(document) = documents.first() else {
            tracing::info!(request_id = %request_id, "No active document for request");
            return Err(AppError::InsufficientData(
                "No active document uploaded for this request".to_string(),
            ));
        };

        // Recorded verbatim for auditability before the external call.
        let payload = json!({
            "user_id": document.owner,
            "request_id": request_id,
            "file_path": document.file_path,
        });

        let job = self
            .jobs
            .create(NewAnalysisJob {
                request_id,
                request: payload.clone(),
            })
            .await?;
        tracing::info!(request_id = %request_id, job_id = %job.id, "Analysis job recorded as pending");

        match self.client.submit(&payload, bearer).await {
            Ok(code) if (200..300).contains(&code) => {
                let job = self.jobs.update(job.id, AnalysisStatus::Ack, None).await?;
                tracing::info!(request_id = %request_id, status = code, "Analysis submission acknowledged");
                Ok(job)
            }
            Ok(code) => {
                tracing::warn!(
                    request_id = %request_id,
                    status = code,
                    "Analysis service did not acknowledge submission"
                );
                let response = json!({"error": format!("analysis service returned status {}", code)});
                self.jobs
                    .update(job.id, AnalysisStatus::Fail, Some(response))
                    .await?;
                Err(AppError::SubmissionFailed {
                    message: "Analysis submission was not acknowledged".to_string(),
                    source: anyhow::anyhow!("analysis service returned status {}", code),
                })
            }
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    error = %err,
                    "Transport failure submitting analysis request"
                );
                let response = json!({"error": err.to_string()});
                self.jobs
                    .update(job.id, AnalysisStatus::Fail, Some(response))
                    .await?;
                Err(AppError::SubmissionFailed {
                    message: "Analysis submission was not acknowledged".to_string(),
                    source: anyhow::Error::new(err),
                })
            }
        }
    }

    /// Apply an inbound status callback.
    ///
    /// Callbacks can be duplicated or delayed: a webhook for an already
    /// successful job is a defined success returning the stored row
    /// unchanged. A webhook for an unknown or already-failed request is
    /// rejected with `NotFound`.
    pub async fn apply_webhook(
        &self,
        request_id: Uuid,
        reported_status: AnalysisStatus,
        message: Option<&str>,
        response: Option<serde_json::Value>,
    ) -> Result<AnalysisJob, AppError> {
        tracing::info!(
            request_id = %request_id,
            status = %reported_status,
            message = message.unwrap_or(""),
            "Analysis webhook received"
        );

        if reported_status == AnalysisStatus::Pending {
            return Err(AppError::InvalidInput(
                "Webhook status must be ACK, SUCCESS, or FAIL".to_string(),
            ));
        }

        let Some(job) = self.jobs.find_latest_non_failed(request_id).await? else {
            tracing::info!(request_id = %request_id, "Webhook for unknown request");
            return Err(AppError::NotFound("Request not found".to_string()));
        };

        if job.status == AnalysisStatus::Success {
            tracing::info!(
                request_id = %request_id,
                "Webhook for already successful analysis, returning unchanged"
            );
            return Ok(job);
        }

        let updated = self.jobs.update(job.id, reported_status, response).await?;
        tracing::info!(
            request_id = %request_id,
            status = %updated.status,
            "Analysis webhook applied"
        );

        Ok(updated)
    }

    /// Fetch the finished analysis for a request id, joined with the ACTIVE
    /// documents sharing its unified id. Only SUCCESS jobs are visible here.
    pub async fn get_result(&self, request_id: Uuid) -> Result<AnalysisResult, AppError> {
        let Some(job) = self.jobs.find_success(request_id).await? else {
            return Err(AppError::NotFound("Request not found".to_string()));
        };

        let documents = self.documents.find_active_by_unified_id(request_id).await?;

        Ok(AnalysisResult { job, documents })
    }
}
