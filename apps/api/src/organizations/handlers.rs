use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::access::{authorize, Action, Resource};
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::organization::Organization;
use crate::organizations::resolver::signup_link;
use crate::organizations::service::{
    backfill_unassigned_candidates, organization_stats, seed_demo_organizations, OrganizationStats,
};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/organizations/stats
pub async fn handle_organization_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<OrganizationStats>>, AppError> {
    authorize(&auth.actor(), Resource::Platform, Action::View).require()?;
    let stats = organization_stats(&state.db).await?;
    Ok(ApiResponse::ok(stats))
}

#[derive(Serialize)]
pub struct BackfillResponse {
    pub updated: u64,
}

/// POST /api/v1/organizations/backfill
pub async fn handle_backfill(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<BackfillResponse>>, AppError> {
    authorize(&auth.actor(), Resource::Platform, Action::Administer).require()?;
    let updated =
        backfill_unassigned_candidates(&state.db, state.organizations.as_ref()).await?;
    audit::record(
        &state.db,
        AuditEntry::new("organizations_backfilled", "organization")
            .by(auth.user_id, auth.organization_id)
            .details(json!({ "updated": updated })),
    )
    .await;
    Ok(ApiResponse::ok(BackfillResponse { updated }))
}

#[derive(Serialize)]
pub struct SeedResponse {
    pub organizations: Vec<Organization>,
}

/// POST /api/v1/organizations/seed-demo
pub async fn handle_seed_demo(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<SeedResponse>>, AppError> {
    authorize(&auth.actor(), Resource::Platform, Action::Administer).require()?;
    let organizations = seed_demo_organizations(state.organizations.as_ref()).await?;
    audit::record(
        &state.db,
        AuditEntry::new("demo_organizations_seeded", "organization")
            .by(auth.user_id, auth.organization_id)
            .details(json!({ "count": organizations.len() })),
    )
    .await;
    Ok(ApiResponse::ok(SeedResponse { organizations }))
}

#[derive(Serialize)]
pub struct SignupLinkResponse {
    pub organization: String,
    pub signup_link: String,
}

/// GET /api/v1/organizations/:slug/signup-link
pub async fn handle_signup_link(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<SignupLinkResponse>>, AppError> {
    let org = state
        .organizations
        .find_by_slug(&slug.to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization '{slug}' not found")))?;
    authorize(&auth.actor(), Resource::Organization(Some(org.id)), Action::View).require()?;

    let link = format!(
        "{}{}",
        state.config.base_url.trim_end_matches('/'),
        signup_link(&org.slug)
    );
    Ok(ApiResponse::ok(SignupLinkResponse {
        organization: org.name,
        signup_link: link,
    }))
}
