//! OpenAPI document aggregation.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::documents::upload_chunk,
        crate::handlers::documents::list_documents,
        crate::handlers::documents::get_document,
        crate::handlers::documents::deactivate_document,
        crate::handlers::documents::delete_document,
        crate::handlers::analysis::process,
        crate::handlers::analysis::webhook,
        crate::handlers::analysis::get_result,
    ),
    components(schemas(
        crate::handlers::documents::DocumentResponse,
        crate::handlers::documents::ChunkUploadResponse,
        crate::handlers::documents::DocumentListResponse,
        crate::handlers::analysis::ProcessRequest,
        crate::handlers::analysis::WebhookRequest,
        crate::handlers::analysis::JobResponse,
        crate::handlers::analysis::AnalysisResultResponse,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "documents", description = "Chunked document ingestion and management"),
        (name = "analysis", description = "External analysis job lifecycle")
    )
)]
pub struct ApiDoc;

pub async fn serve_openapi() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}
