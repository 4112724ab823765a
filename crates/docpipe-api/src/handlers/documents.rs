//! Document handlers: chunk upload, listing, lookup, deactivation, deletion.

use crate::auth::models::CallerContext;
use crate::auth::require_editor;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docpipe_core::models::{Document, DocumentStatus};
use docpipe_core::AppError;
use docpipe_db::DocumentRepository;
use docpipe_services::ChunkIngest;
use docpipe_storage::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Document metadata in responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub unified_id: Uuid,
    pub file_name: String,
    pub actual_file_name: String,
    pub file_path: String,
    pub file_size: i64,
    #[schema(value_type = String)]
    pub file_type: docpipe_core::models::DocumentType,
    #[schema(value_type = String)]
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            unified_id: doc.unified_id,
            file_name: doc.file_name,
            actual_file_name: doc.actual_file_name,
            file_path: doc.file_path,
            file_size: doc.file_size,
            file_type: doc.file_type,
            status: doc.status,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Response for one chunk upload: either "still incomplete" or the created
/// document's metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChunkUploadResponse {
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<DocumentResponse>,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::InvalidInput(format!("Missing or invalid header: {}", name)))
}

fn header_parse<T: FromStr>(headers: &HeaderMap, name: &str) -> Result<T, AppError> {
    header_str(headers, name)?
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Missing or invalid header: {}", name)))
}

/// Upload one chunk of a document
///
/// Sidecar metadata arrives in headers; the chunk bytes in the multipart
/// `file` field. All chunks of one physical file share `x-file-name`.
#[utoipa::path(
    post,
    path = "/api/v1/documents/chunks",
    tag = "documents",
    responses(
        (status = 200, description = "Chunk stored; document metadata when the upload completed", body = ChunkUploadResponse),
        (status = 400, description = "Invalid input or unsupported file type", body = ErrorResponse),
        (status = 413, description = "Chunk too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    require_editor(&caller)?;

    let unified_id: Uuid = header_parse(&headers, "x-unified-id")?;
    let file_name: String = header_str(&headers, "x-file-name")?.to_string();
    let actual_file_name = headers
        .get("x-actual-file-name")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("file")
        .to_string();
    let declared_size: i64 = header_parse(&headers, "x-file-size")?;
    let total_chunks: u32 = header_parse(&headers, "x-total-chunks")?;
    let index: u32 = header_parse(&headers, "x-chunk-index")?;

    let mut data: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(|e| {
                AppError::InvalidInput(format!("Failed to read chunk bytes: {}", e))
            })?);
        }
    }

    let Some(data) = data else {
        return Err(AppError::InvalidInput(
            "Missing multipart field: file".to_string(),
        )
        .into());
    };

    if data.len() > state.config.max_chunk_size_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Chunk of {} bytes exceeds the {} byte limit",
            data.len(),
            state.config.max_chunk_size_bytes
        ))
        .into());
    }

    let document = state
        .assembler
        .ingest(
            ChunkIngest {
                unified_id,
                file_name,
                actual_file_name,
                declared_size,
                total_chunks,
                index,
                data,
            },
            &caller,
        )
        .await?;

    Ok(Json(ChunkUploadResponse {
        complete: document.is_some(),
        document: document.map(DocumentResponse::from),
    }))
}

/// List documents visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    params(
        ("limit" = Option<i64>, Query, description = "Page size, capped by the server"),
        ("page" = Option<i64>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Documents with total count", body = DocumentListResponse)
    )
)]
pub async fn list_documents(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.list_limit_cap)
        .clamp(1, state.config.list_limit_cap);
    let page = query.page.unwrap_or(1);
    let offset = if page > 0 { (page - 1) * limit } else { 0 };

    let (documents, count) = state
        .documents
        .list(limit, offset, caller.owner_scope())
        .await?;

    Ok(Json(DocumentListResponse {
        data: documents.into_iter().map(DocumentResponse::from).collect(),
        count,
    }))
}

/// Fetch a document by id
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_document(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = state
        .documents
        .find_by_id(id, caller.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    Ok(Json(DocumentResponse::from(document)))
}

/// Mark a document inactive
///
/// Already-inactive documents are returned unchanged.
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}/deactivate",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document after deactivation", body = DocumentResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn deactivate_document(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_editor(&caller)?;

    let document = state
        .documents
        .find_by_id(id, caller.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if document.status == DocumentStatus::Inactive {
        tracing::info!(document_id = %id, "Document already inactive");
        return Ok(Json(DocumentResponse::from(document)));
    }

    let document = state
        .documents
        .set_status(id, caller.owner_scope(), DocumentStatus::Inactive)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    tracing::info!(document_id = %id, "Document deactivated");
    Ok(Json(DocumentResponse::from(document)))
}

/// Delete a document permanently
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_document(
    CallerContext(caller): CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_editor(&caller)?;

    let document = state
        .documents
        .find_by_id(id, caller.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    state.documents.delete(id, caller.owner_scope()).await?;

    // The row is the source of truth; stored bytes are cleaned up best-effort.
    if let Err(err) = state.artifacts.delete(&document.file_name).await {
        tracing::warn!(
            document_id = %id,
            file_name = %document.file_name,
            error = %err,
            "Failed to delete stored file for removed document"
        );
    }

    tracing::info!(document_id = %id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}
