pub mod middleware;
pub mod models;
pub mod token;

use docpipe_core::models::{Caller, UserRole};
use docpipe_core::AppError;

/// Mutating document and analysis operations require editor or admin.
pub fn require_editor(caller: &Caller) -> Result<(), AppError> {
    match caller.role {
        UserRole::Admin | UserRole::Editor => Ok(()),
        UserRole::Viewer => Err(AppError::Forbidden(
            "This operation requires an editor or admin role".to_string(),
        )),
    }
}
