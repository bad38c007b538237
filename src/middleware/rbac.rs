//! Role-based access control extractors for Axum handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::AppState;

/// Extractor that requires the caller to be an admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(RequireAdmin(user))
    }
}

/// Agents may only touch records they own; admins may touch any.
pub fn ensure_owner_or_admin(
    user: &CurrentUser,
    owner_id: Option<Uuid>,
    what: &str,
) -> Result<(), AppError> {
    if user.is_admin() || owner_id == Some(user.id) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "You can only modify {what} assigned to you"
    )))
}
