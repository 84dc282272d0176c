use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{authorize, Action, Resource};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::audit::AuditLog;
use crate::models::user::UserRole;
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub organization_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<AuditLog>,
}

/// GET /api/v1/audit
///
/// Admins read their own organization's trail; super admins may pass `organization_id`
/// or read across all tenants.
pub async fn handle_list_audit(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<AuditListResponse>>, AppError> {
    auth.load(&state.db).await?;
    let scope = match auth.role {
        UserRole::SuperAdmin => query.organization_id,
        _ => auth.organization_id,
    };
    authorize(&auth.actor(), Resource::Organization(scope), Action::Administer).require()?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let entries: Vec<AuditLog> = sqlx::query_as(
        r#"
        SELECT * FROM audit_logs
        WHERE ($1::uuid IS NULL OR organization_id = $1)
          AND ($2::text IS NULL OR action = $2)
          AND ($3::text IS NULL OR resource_type = $3)
        ORDER BY created_at DESC
        LIMIT $4
        "#,
    )
    .bind(scope)
    .bind(query.action)
    .bind(query.resource_type)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(AuditListResponse { entries }))
}
