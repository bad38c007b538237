//! Admin user management: listing, activation, and deletion.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{like_pattern, PagedResult, Pagination};
use crate::models::user::{User, UserResponse, UserRole};

/// Filters for listing users.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserFilters {
    pub role: Option<UserRole>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

/// List users, oldest first.
pub async fn list(
    pool: &PgPool,
    filters: &UserFilters,
    pagination: &Pagination,
) -> Result<PagedResult<UserResponse>, AppError> {
    let search = filters
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(like_pattern);

    let where_clause = "WHERE ($1::user_role IS NULL OR role = $1) \
                        AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2)";

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {where_clause}"))
        .bind(filters.role)
        .bind(&search)
        .fetch_one(pool)
        .await?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM users {where_clause} ORDER BY created_at ASC, id ASC LIMIT $3 OFFSET $4"
    ))
    .bind(filters.role)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let items = users.into_iter().map(UserResponse::from).collect();
    Ok(PagedResult::new(items, total, pagination))
}

/// Activate or deactivate an account. Admins cannot deactivate themselves.
pub async fn set_active(
    pool: &PgPool,
    actor_id: Uuid,
    id: Uuid,
    is_active: bool,
) -> Result<User, AppError> {
    if actor_id == id && !is_active {
        return Err(AppError::Validation(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(is_active)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, actor_id = %actor_id, is_active, "User status changed");
    Ok(user)
}

/// Delete an account. Leads it owned become unattributed.
pub async fn delete(pool: &PgPool, actor_id: Uuid, id: Uuid) -> Result<(), AppError> {
    if actor_id == id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, actor_id = %actor_id, "User deleted");
    Ok(())
}
