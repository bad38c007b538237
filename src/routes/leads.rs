//! Lead routes: CRUD, search, and notes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::lead::{CreateLead, CreateLeadNote, Lead, UpdateLead};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::auth as auth_service;
use crate::services::lead::{self as lead_service, LeadFilters};
use crate::AppState;

/// GET /api/leads: list leads with filters, pagination, and search.
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<LeadFilters>,
) -> Result<Json<ApiResponse<PagedResult<Lead>>>, AppError> {
    let result = lead_service::list(&state.db, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/leads
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateLead>,
) -> Result<Json<ApiResponse<Lead>>, AppError> {
    body.validate()?;
    let owner = lead_service::resolve_owner(&current_user, body.agent_id);
    let lead = lead_service::create(&state.db, &body, owner).await?;
    Ok(ApiResponse::success(lead))
}

/// GET /api/leads/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Lead>>, AppError> {
    let lead = lead_service::find_by_id(&state.db, id).await?;
    Ok(ApiResponse::success(lead))
}

/// PUT /api/leads/:id
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLead>,
) -> Result<Json<ApiResponse<Lead>>, AppError> {
    body.validate()?;
    let lead = lead_service::update(&state.db, id, &body, &current_user).await?;
    Ok(ApiResponse::success(lead))
}

/// POST /api/leads/:id/notes
pub async fn add_note(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateLeadNote>,
) -> Result<Json<ApiResponse<Lead>>, AppError> {
    body.validate()?;
    let author = auth_service::find_user_by_id(&state.db, current_user.id).await?;
    let lead = lead_service::add_note(&state.db, id, &body, &current_user, &author.name).await?;
    Ok(ApiResponse::success(lead))
}

/// DELETE /api/leads/:id
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    lead_service::delete(&state.db, id, &current_user).await?;
    Ok(ApiResponse::success("Lead deleted"))
}
