use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::access::{authorize, Action, Resource};
use crate::analytics::metrics::{dashboard, Dashboard};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::UserRole;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/analytics/dashboard
///
/// Recruiters and admins see their own organization. Super admins see the whole
/// platform, including the cross-organization rankings.
pub async fn handle_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Dashboard>>, AppError> {
    let scope = if auth.role == UserRole::SuperAdmin {
        None
    } else {
        authorize(
            &auth.actor(),
            Resource::Organization(auth.organization_id),
            Action::View,
        )
        .require()?;
        Some(
            auth.organization_id
                .ok_or_else(|| AppError::Validation("Your account has no organization".into()))?,
        )
    };

    let data = dashboard(&state.db, scope).await?;
    info!(
        user_id = %auth.user_id,
        organization_id = ?scope,
        "Built analytics dashboard"
    );
    Ok(ApiResponse::ok(data))
}
