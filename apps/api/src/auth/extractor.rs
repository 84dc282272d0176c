use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::Actor;
use crate::auth::jwt::validate_token;
use crate::errors::AppError;
use crate::models::user::{User, UserRole};
use crate::state::AppState;

/// Caller identity taken from the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
            organization_id: self.organization_id,
        }
    }

    /// Loads the caller's row, rejecting soft-disabled accounts.
    pub async fn load(&self, pool: &PgPool) -> Result<User, AppError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(self.user_id)
            .fetch_optional(pool)
            .await?;
        let user = user.ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;
        if !user.user_active {
            return Err(AppError::Forbidden("Account is disabled".into()));
        }
        Ok(user)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        let claims = validate_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        match state.accounts.is_active(claims.sub).await? {
            None => return Err(AppError::Unauthorized("Account no longer exists".into())),
            Some(false) => return Err(AppError::Forbidden("Account is disabled".into())),
            Some(true) => {}
        }

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
            organization_id: claims.org,
        })
    }
}
