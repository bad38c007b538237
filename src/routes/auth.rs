//! Authentication routes: register, login, refresh, logout, and profile.

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::user::{UpdateProfile, UserResponse, UserRole};
use crate::services::auth::{self as auth_service, AuthResponse, TokenPair, TokenSettings};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Role picked on the login form, checked against the account.
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/register: self-service agent signup
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    body.validate()?;
    let response = auth_service::register(
        &state.db,
        &body.name,
        &body.email,
        &body.password,
        &TokenSettings::from(&state.config),
    )
    .await?;
    Ok(ApiResponse::success(response))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    body.validate()?;
    let response = auth_service::login(
        &state.db,
        &body.email,
        &body.password,
        body.role,
        &TokenSettings::from(&state.config),
    )
    .await?;
    Ok(ApiResponse::success(response))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let tokens = auth_service::refresh_token(
        &state.db,
        &body.refresh_token,
        &TokenSettings::from(&state.config),
    )
    .await?;
    Ok(ApiResponse::success(tokens))
}

/// POST /api/auth/logout: tokens are stateless, the client discards them
pub async fn logout() -> Json<ApiResponse<&'static str>> {
    ApiResponse::success("Logged out successfully")
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = auth_service::find_user_by_id(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// PUT /api/auth/update-profile
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    body.validate()?;
    let user = auth_service::update_profile(&state.db, current_user.id, &body).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}
