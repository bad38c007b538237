//! Customer service: CRUD and search.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::customer::{CreateCustomer, Customer, UpdateCustomer};
use crate::models::pagination::{like_pattern, PagedResult, Pagination};

/// Filters for listing customers.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomerFilters {
    /// Case-insensitive match on name, email, phone, or company.
    pub search: Option<String>,
}

/// List customers, newest first.
pub async fn list(
    pool: &PgPool,
    filters: &CustomerFilters,
    pagination: &Pagination,
) -> Result<PagedResult<Customer>, AppError> {
    let search = filters
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(like_pattern);

    let where_clause = "WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 \
                        OR phone ILIKE $1 OR company ILIKE $1)";

    let total =
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM customers {where_clause}"))
            .bind(&search)
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, Customer>(&format!(
        "SELECT * FROM customers {where_clause} \
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Find a customer by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Customer, AppError> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
}

pub async fn create(pool: &PgPool, input: &CreateCustomer) -> Result<Customer, AppError> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, email, phone, company, address, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(input.phone.trim())
    .bind(&input.company)
    .bind(&input.address)
    .bind(&input.notes)
    .fetch_one(pool)
    .await?;

    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok(customer)
}

pub async fn update(pool: &PgPool, id: Uuid, input: &UpdateCustomer) -> Result<Customer, AppError> {
    sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            company = COALESCE($5, company),
            address = COALESCE($6, address),
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.name.as_deref().map(str::trim))
    .bind(input.email.as_deref().map(str::trim))
    .bind(input.phone.as_deref().map(str::trim))
    .bind(&input.company)
    .bind(&input.address)
    .bind(&input.notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
}

pub async fn delete(pool: &PgPool, id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Customer not found".to_string()));
    }

    tracing::info!(customer_id = %id, actor_id = %actor_id, "Customer deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_default_to_no_search() {
        let filters: CustomerFilters = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(filters.search.is_none());
    }

    #[test]
    fn filters_ignore_paging_params() {
        let filters: CustomerFilters =
            serde_json::from_value(serde_json::json!({"search": "tailspin", "page": 2}))
                .unwrap();
        assert_eq!(filters.search.as_deref(), Some("tailspin"));
    }
}
