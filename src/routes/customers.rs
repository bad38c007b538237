//! Customer routes: CRUD and search.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::customer::{CreateCustomer, Customer, UpdateCustomer};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::customer::{self as customer_service, CustomerFilters};
use crate::AppState;

/// GET /api/customers
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<CustomerFilters>,
) -> Result<Json<ApiResponse<PagedResult<Customer>>>, AppError> {
    let result = customer_service::list(&state.db, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/customers
pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<CreateCustomer>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    body.validate()?;
    let customer = customer_service::create(&state.db, &body).await?;
    Ok(ApiResponse::success(customer))
}

/// GET /api/customers/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let customer = customer_service::find_by_id(&state.db, id).await?;
    Ok(ApiResponse::success(customer))
}

/// PUT /api/customers/:id
pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCustomer>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    body.validate()?;
    let customer = customer_service::update(&state.db, id, &body).await?;
    Ok(ApiResponse::success(customer))
}

/// DELETE /api/customers/:id
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    customer_service::delete(&state.db, id, current_user.id).await?;
    Ok(ApiResponse::success("Customer deleted"))
}
