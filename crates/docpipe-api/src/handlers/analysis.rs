//! Analysis handlers: submission, the inbound status webhook, and result
//! retrieval.

use crate::auth::models::CallerContext;
use crate::auth::{require_editor, token::issue_token};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::documents::DocumentResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use docpipe_core::models::{AnalysisJob, AnalysisStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRequest {
    pub request_id: Uuid,
}

/// Inbound webhook payload from the analysis service.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookRequest {
    pub request_id: Uuid,
    #[schema(value_type = String)]
    pub status: AnalysisStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    #[schema(value_type = Object)]
    pub request: serde_json::Value,
    #[schema(value_type = Option<Object>)]
    pub response: Option<serde_json::Value>,
    #[schema(value_type = String)]
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnalysisJob> for JobResponse {
    fn from(job: AnalysisJob) -> Self {
        JobResponse {
            id: job.id,
            request_id: job.request_id,
            request: job.request,
            response: job.response,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Finished analysis joined with the request's active documents.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResultResponse {
    pub request_id: Uuid,
    #[schema(value_type = String)]
    pub status: AnalysisStatus,
    #[schema(value_type = Option<Object>)]
    pub response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_metadata: Vec<DocumentResponse>,
}

/// Submit a request for analysis
#[utoipa::path(
    post,
    path = "/api/v1/analysis/process",
    tag = "analysis",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Job acknowledged or already in progress", body = JobResponse),
        (status = 400, description = "No active document for the request", body = ErrorResponse),
        (status = 502, description = "Submission not acknowledged", body = ErrorResponse)
    )
)]
pub async fn process(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ProcessRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_editor(&caller)?;

    let bearer = issue_token(
        &caller,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    let job = state
        .analysis
        .submit(request.request_id, &caller, &bearer)
        .await?;

    Ok(Json(JobResponse::from(job)))
}

/// Receive a status callback from the analysis service
///
/// Replays and late callbacks for finished jobs are accepted and ignored.
#[utoipa::path(
    post,
    path = "/api/v1/analysis/webhook",
    tag = "analysis",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Job after applying the callback", body = JobResponse),
        (status = 404, description = "Unknown request id", body = ErrorResponse)
    )
)]
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<WebhookRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .analysis
        .apply_webhook(
            request.request_id,
            request.status,
            request.message.as_deref(),
            request.response,
        )
        .await?;

    Ok(Json(JobResponse::from(job)))
}

/// Fetch the result of a finished analysis
#[utoipa::path(
    get,
    path = "/api/v1/analysis/{request_id}",
    tag = "analysis",
    params(("request_id" = Uuid, Path, description = "Logical request ID")),
    responses(
        (status = 200, description = "Result with document metadata", body = AnalysisResultResponse),
        (status = 404, description = "No successful analysis for this request", body = ErrorResponse)
    )
)]
pub async fn get_result(
    CallerContext(_caller): CallerContext,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let result = state.analysis.get_result(request_id).await?;

    Ok(Json(AnalysisResultResponse {
        request_id: result.job.request_id,
        status: result.job.status,
        response: result.job.response,
        created_at: result.job.created_at,
        updated_at: result.job.updated_at,
        file_metadata: result
            .documents
            .into_iter()
            .map(DocumentResponse::from)
            .collect(),
    }))
}
