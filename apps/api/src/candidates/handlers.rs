use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::policy::ProfileAccess;
use crate::access::{authorize, Action, Resource};
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::candidates::pool::{search_pool, CandidateSummary, PoolFilters};
use crate::candidates::profile::{
    set_employee_status, update_profile, update_visibility, ProfileUpdate, VisibilityUpdate,
};
use crate::errors::AppError;
use crate::models::user::{User, UserRole};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CandidatePoolResponse {
    pub candidates: Vec<CandidateSummary>,
    pub count: usize,
}

/// GET /api/v1/candidates
pub async fn handle_candidate_pool(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<PoolFilters>,
) -> Result<Json<ApiResponse<CandidatePoolResponse>>, AppError> {
    if !auth.role.is_staff() {
        return Err(AppError::Forbidden(
            "Only recruiters can browse the candidate pool".into(),
        ));
    }
    auth.load(&state.db).await?;
    let all_tenants = auth.role == UserRole::SuperAdmin;
    let candidates = search_pool(&state.db, auth.organization_id, all_tenants, &filters).await?;
    Ok(ApiResponse::ok(CandidatePoolResponse {
        count: candidates.len(),
        candidates,
    }))
}

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: User,
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    let user = load_user(&state, id).await?;
    let profile = ProfileAccess::from(&user);
    authorize(&auth.actor(), Resource::Profile(&profile), Action::View).require()?;
    Ok(ApiResponse::ok(ProfileResponse { user }))
}

/// PATCH /api/v1/candidates/me
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    auth.load(&state.db).await?;
    let user = update_profile(&state.db, auth.user_id, &update).await?;
    Ok(ApiResponse::ok(ProfileResponse { user }))
}

/// PATCH /api/v1/candidates/me/visibility
pub async fn handle_update_visibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<VisibilityUpdate>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    auth.load(&state.db).await?;
    let user = update_visibility(&state.db, auth.user_id, update).await?;
    audit::record(
        &state.db,
        AuditEntry::new("profile_visibility_changed", "user")
            .by(user.id, user.organization_id)
            .resource(user.id)
            .details(json!({
                "public_profile_enabled": user.public_profile_enabled,
                "cross_org_accessible": user.cross_org_accessible,
            })),
    )
    .await;
    Ok(ApiResponse::ok(ProfileResponse { user }))
}

#[derive(Debug, Deserialize)]
pub struct EmployeeStatusRequest {
    pub is_organization_employee: bool,
}

/// PATCH /api/v1/candidates/:id/employee-status
///
/// Admins mark members of their own organization as employees.
pub async fn handle_set_employee_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<EmployeeStatusRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    let candidate = load_user(&state, id).await?;
    authorize(
        &auth.actor(),
        Resource::Organization(candidate.organization_id),
        Action::Administer,
    )
    .require()?;

    let user = set_employee_status(&state.db, id, req.is_organization_employee).await?;
    audit::record(
        &state.db,
        AuditEntry::new("employee_status_changed", "user")
            .by(auth.user_id, auth.organization_id)
            .resource(user.id)
            .details(json!({ "is_organization_employee": user.is_organization_employee })),
    )
    .await;
    Ok(ApiResponse::ok(ProfileResponse { user }))
}
