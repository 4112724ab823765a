//! Route configuration and setup.

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Slack on top of the chunk limit for multipart framing and headers.
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn setup_cors(state: &AppState) -> Result<CorsLayer, anyhow::Error> {
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins = state
            .config
            .cors_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Ok(cors)
}

/// Setup all application routes
pub fn build_router(state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(&state)?;
    let auth_state = Arc::new(AuthState {
        jwt_secret: state.config.jwt_secret.clone(),
    });

    // The webhook is an inbound callback from the analysis service and is
    // not bearer-authenticated; idempotent handling bounds what a caller
    // can do with it.
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/v1/analysis/webhook", post(handlers::analysis::webhook));

    let protected_routes = Router::new()
        .route(
            "/api/v1/documents/chunks",
            post(handlers::documents::upload_chunk),
        )
        .route("/api/v1/documents", get(handlers::documents::list_documents))
        .route(
            "/api/v1/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route(
            "/api/v1/documents/{id}/deactivate",
            patch(handlers::documents::deactivate_document),
        )
        .route("/api/v1/analysis/process", post(handlers::analysis::process))
        .route(
            "/api/v1/analysis/{request_id}",
            get(handlers::analysis::get_result),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    let body_limit = state.config.max_chunk_size_bytes + BODY_LIMIT_OVERHEAD;

    let app = public_routes
        .merge(protected_routes)
        .with_state(state)
        .route("/api/openapi.json", get(crate::api_doc::serve_openapi))
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(app)
}
