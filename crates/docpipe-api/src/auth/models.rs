use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use docpipe_core::models::Caller;

/// Caller identity extracted from the JWT and stored in request extensions.
///
/// Implemented as an extractor so handlers that also take `Multipart` can
/// receive it from request parts.
#[derive(Debug, Clone)]
pub struct CallerContext(pub Caller);

impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing caller context".to_string(),
                        details: None,
                        error_type: None,
                        code: "MISSING_CALLER_CONTEXT".to_string(),
                        recoverable: false,
                        suggested_action: Some("Check authentication token".to_string()),
                    }),
                )
            })
    }
}
