//! Lead service: CRUD, search, ownership, and note history.

use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::ensure_owner_or_admin;
use crate::models::lead::{CreateLead, CreateLeadNote, Lead, LeadNote, LeadStatus, UpdateLead};
use crate::models::pagination::{like_pattern, PagedResult, Pagination};

/// Filters for listing leads.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilters {
    pub status: Option<LeadStatus>,
    pub agent_id: Option<Uuid>,
    /// Case-insensitive match on name, email, phone, or source.
    pub search: Option<String>,
}

/// Owner of a new lead: admins may assign anyone, agents always own what they create.
pub fn resolve_owner(caller: &CurrentUser, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(agent_id) if caller.is_admin() => agent_id,
        _ => caller.id,
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::Validation("Assigned agent does not exist".to_string())
        }
        _ => AppError::Database(e),
    }
}

/// List leads, newest first.
pub async fn list(
    pool: &PgPool,
    filters: &LeadFilters,
    pagination: &Pagination,
) -> Result<PagedResult<Lead>, AppError> {
    let status = filters.status.map(|s| s.label());
    let search = filters
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(like_pattern);

    let where_clause = "WHERE ($1::text IS NULL OR status = $1) \
                        AND ($2::uuid IS NULL OR agent_id = $2) \
                        AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3 \
                             OR phone ILIKE $3 OR source ILIKE $3)";

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM leads {where_clause}"))
        .bind(status)
        .bind(filters.agent_id)
        .bind(&search)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, Lead>(&format!(
        "SELECT * FROM leads {where_clause} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(status)
    .bind(filters.agent_id)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Find a lead by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Lead, AppError> {
    sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))
}

/// Create a lead owned by `agent_id`.
pub async fn create(pool: &PgPool, input: &CreateLead, agent_id: Uuid) -> Result<Lead, AppError> {
    let lead = sqlx::query_as::<_, Lead>(
        r#"
        INSERT INTO leads (name, email, phone, source, status, notes, agent_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(input.phone.trim())
    .bind(&input.source)
    .bind(input.status.label())
    .bind(&input.notes)
    .bind(agent_id)
    .fetch_one(pool)
    .await
    .map_err(map_write_error)?;

    tracing::info!(lead_id = %lead.id, agent_id = %agent_id, status = %input.status, "Lead created");
    Ok(lead)
}

/// Update lead fields. Only admins may reassign the owner.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: &UpdateLead,
    caller: &CurrentUser,
) -> Result<Lead, AppError> {
    let existing = find_by_id(pool, id).await?;
    ensure_owner_or_admin(caller, existing.agent_id, "leads")?;

    if let Some(agent_id) = input.agent_id {
        if !caller.is_admin() && Some(agent_id) != existing.agent_id {
            return Err(AppError::Forbidden(
                "Only admins can reassign leads".to_string(),
            ));
        }
    }

    let lead = sqlx::query_as::<_, Lead>(
        r#"
        UPDATE leads SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            source = COALESCE($5, source),
            status = COALESCE($6, status),
            notes = COALESCE($7, notes),
            lead_notes = COALESCE($8, lead_notes),
            agent_id = COALESCE($9, agent_id),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.name.as_deref().map(str::trim))
    .bind(input.email.as_deref().map(str::trim))
    .bind(input.phone.as_deref().map(str::trim))
    .bind(&input.source)
    .bind(input.status.map(|s| s.label()))
    .bind(&input.notes)
    .bind(input.lead_notes.clone().map(Json))
    .bind(input.agent_id)
    .fetch_one(pool)
    .await
    .map_err(map_write_error)?;

    if input.status.is_some() && existing.status != lead.status {
        tracing::info!(
            lead_id = %id,
            from = %existing.status,
            to = %lead.status,
            "Lead status changed"
        );
    }
    Ok(lead)
}

/// Append a note stamped with the server clock and the author's name.
pub async fn add_note(
    pool: &PgPool,
    id: Uuid,
    input: &CreateLeadNote,
    caller: &CurrentUser,
    author_name: &str,
) -> Result<Lead, AppError> {
    let existing = find_by_id(pool, id).await?;
    ensure_owner_or_admin(caller, existing.agent_id, "leads")?;

    let note = LeadNote {
        text: input.text.trim().to_string(),
        date: Utc::now(),
        author: Some(author_name.to_string()),
    };

    let lead = sqlx::query_as::<_, Lead>(
        "UPDATE leads SET lead_notes = lead_notes || $2, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(Json(vec![note]))
    .fetch_one(pool)
    .await?;

    Ok(lead)
}

/// Delete a lead.
pub async fn delete(pool: &PgPool, id: Uuid, caller: &CurrentUser) -> Result<(), AppError> {
    let existing = find_by_id(pool, id).await?;
    ensure_owner_or_admin(caller, existing.agent_id, "leads")?;

    sqlx::query("DELETE FROM leads WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(lead_id = %id, actor_id = %caller.id, "Lead deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn caller(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "caller@crm.test".to_string(),
            role,
        }
    }

    #[test]
    fn admin_can_assign_owner() {
        let admin = caller(UserRole::Admin);
        let agent = Uuid::new_v4();
        assert_eq!(resolve_owner(&admin, Some(agent)), agent);
        assert_eq!(resolve_owner(&admin, None), admin.id);
    }

    #[test]
    fn agent_always_owns_new_leads() {
        let agent = caller(UserRole::Agent);
        assert_eq!(resolve_owner(&agent, Some(Uuid::new_v4())), agent.id);
        assert_eq!(resolve_owner(&agent, None), agent.id);
    }

    #[test]
    fn filters_accept_display_status() {
        let filters: LeadFilters = serde_json::from_value(serde_json::json!({
            "status": "In Progress",
            "search": "acme"
        }))
        .unwrap();
        assert_eq!(filters.status, Some(LeadStatus::InProgress));
        assert!(filters.agent_id.is_none());
    }
}
