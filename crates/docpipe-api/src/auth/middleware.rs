use crate::auth::models::CallerContext;
use crate::auth::token::verify_token;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use docpipe_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

/// Bearer-JWT authentication middleware. On success the verified caller is
/// inserted into request extensions for the [`CallerContext`] extractor.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Authorization header must use the Bearer scheme".to_string(),
        ))
        .into_response();
    };

    match verify_token(token, &auth_state.jwt_secret) {
        Ok(caller) => {
            request.extensions_mut().insert(CallerContext(caller));
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Authentication failed");
            HttpAppError(err).into_response()
        }
    }
}
