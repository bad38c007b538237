//! Dashboard route: the summary for the overview page.

use axum::{extract::State, Json};
use chrono::Utc;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::services::dashboard::{self, DashboardSummary};
use crate::AppState;

/// GET /api/dashboard: totals, today's counts, and the status pipeline.
/// Admins also get per-user conversion.
///
/// The summary is the response body itself (`totalLeads`, ... at the top
/// level), not wrapped in the `{data, error}` envelope. Failures still use
/// the envelope through [`AppError`].
pub async fn summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    let now = Utc::now().with_timezone(&state.config.business_offset());
    let summary = dashboard::get_summary(&state.db, current_user.role, now).await?;
    Ok(Json(summary))
}
