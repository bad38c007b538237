//! Admin user management routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::RequireAdmin;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::user::{CreateUser, UpdateUserStatus, UserResponse};
use crate::services::auth as auth_service;
use crate::services::user::{self as user_service, UserFilters};
use crate::AppState;

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<UserFilters>,
) -> Result<Json<ApiResponse<PagedResult<UserResponse>>>, AppError> {
    let result = user_service::list(&state.db, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CreateUser>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    body.validate()?;
    let user = auth_service::create_user(&state.db, &body).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// PUT /api/users/:id/status
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserStatus>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = user_service::set_active(&state.db, admin.id, id, body.is_active).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    user_service::delete(&state.db, admin.id, id).await?;
    Ok(ApiResponse::success("User deleted"))
}
