use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{authorize, Action, Resource};
use crate::audit::{self, AuditEntry};
use crate::auth::jwt::generate_access_token;
use crate::auth::registration::{
    assignable_staff_role, create_staff_user, insert_candidate, prepare_candidate,
    record_registration, register_candidate, verify_password_blocking, NewAccount,
    SignupContext,
};
use crate::auth::validation::{check_rate_limit, validate_name};
use crate::auth::AuthUser;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::user::{RegistrationSource, User, UserRole};
use crate::organizations::Assignment;
use crate::resumes::service::{insert_resume, parse_resume_file, populate_profile};
use crate::resumes::uploads::{content_type_for, read_upload, UploadKind};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{object_key, with_stored_object};

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Assignment>,
}

fn issue_token(config: &Config, user: &User) -> Result<String, AppError> {
    generate_access_token(
        user.id,
        user.role,
        user.organization_id,
        &config.jwt_secret,
        config.jwt_expiry_mins,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub context: SignupContext,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let account = NewAccount {
        username: Some(req.username.trim().to_string()),
        email: req.email.trim().to_string(),
        password: req.password,
        first_name: Some(req.first_name.trim().to_string()),
        last_name: Some(req.last_name.trim().to_string()),
        phone: req.phone.filter(|p| !p.trim().is_empty()),
        source: RegistrationSource::Manual,
    };
    let (user, assignment) =
        register_candidate(&state.db, state.organizations.as_ref(), account, &req.context).await?;
    let token = issue_token(&state.config, &user)?;
    Ok(ApiResponse::created(AuthResponse {
        token,
        user,
        organization: Some(assignment),
    }))
}

#[derive(Debug, Deserialize)]
pub struct QuickRegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub context: SignupContext,
}

/// POST /api/v1/auth/register/quick
///
/// Email and password only; the username is derived from the email.
pub async fn handle_quick_register(
    State(state): State<AppState>,
    Json(req): Json<QuickRegisterRequest>,
) -> Result<Response, AppError> {
    let account = NewAccount {
        username: None,
        email: req.email.trim().to_string(),
        password: req.password,
        first_name: req.first_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        last_name: req.last_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        phone: None,
        source: RegistrationSource::Quick,
    };
    let (user, assignment) =
        register_candidate(&state.db, state.organizations.as_ref(), account, &req.context).await?;
    let token = issue_token(&state.config, &user)?;
    Ok(ApiResponse::created(AuthResponse {
        token,
        user,
        organization: Some(assignment),
    }))
}

/// Parsed names are only used when they would pass manual validation.
fn acceptable_name(name: Option<&String>, field: &str) -> Option<String> {
    name.filter(|n| validate_name(n, field).is_ok()).cloned()
}

#[derive(Serialize)]
pub struct ResumeRegisterResponse {
    #[serde(flatten)]
    pub auth: AuthResponse,
    pub resume_id: Uuid,
    pub generated_by_ai: bool,
}

/// POST /api/v1/auth/register/resume
///
/// Multipart: `resume` file, `password`, and optional `email`, `org`, `referrer_url`,
/// `invitation_code`. A missing email is taken from the resume.
pub async fn handle_resume_register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_upload(multipart, "resume", UploadKind::Resume).await?;
    let password = form
        .field("password")
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Password is required".into()))?;
    let form_email = form.field("email").map(|e| e.trim().to_string());
    let context = SignupContext {
        org: form.field("org").map(str::to_string),
        referrer_url: form.field("referrer_url").map(str::to_string),
        invitation_code: form.field("invitation_code").map(str::to_string),
    };
    let (file, _) = form.require_file()?;

    let upload = parse_resume_file(state.ai.as_ref(), file.bytes.clone(), &file.filename).await?;
    let info = &upload.parsed.value.personal_info;
    let email = form_email
        .or_else(|| info.email.clone())
        .ok_or_else(|| {
            AppError::Validation("Email is required; none was found in the resume".into())
        })?;

    let account = NewAccount {
        username: None,
        email,
        password,
        first_name: acceptable_name(info.first_name.as_ref(), "First name"),
        last_name: acceptable_name(info.last_name.as_ref(), "Last name"),
        phone: None,
        source: RegistrationSource::ResumeUpload,
    };
    let prepared =
        prepare_candidate(&state.db, state.organizations.as_ref(), account, &context).await?;

    // The file goes up first under the reserved id; the account and resume rows are then
    // written together, and the object is removed if that transaction fails.
    let key = object_key(UploadKind::Resume.storage_prefix(), prepared.id, &file.extension);
    let (db, key_ref, prepared_ref, file_ref, upload_ref) =
        (&state.db, key.as_str(), &prepared, &file, &upload);
    let (user, resume) = with_stored_object(
        state.storage.as_ref(),
        &key,
        file.bytes.clone(),
        content_type_for(&file.extension),
        move || async move {
            let mut tx = db.begin().await?;
            let user = insert_candidate(&mut *tx, prepared_ref).await?;
            let resume = insert_resume(&mut tx, user.id, key_ref, file_ref, upload_ref).await?;
            tx.commit().await?;
            Ok::<_, AppError>((user, resume))
        },
    )
    .await?;
    record_registration(&state.db, &user, &prepared).await;

    if let Err(e) = populate_profile(&state.db, user.id, &upload.parsed.value).await {
        warn!(user_id = %user.id, "Could not populate profile from resume: {e}");
    }

    let user = reload(&state.db, user.id).await?;
    let token = issue_token(&state.config, &user)?;
    Ok(ApiResponse::created(ResumeRegisterResponse {
        auth: AuthResponse {
            token,
            user,
            organization: Some(prepared.assignment),
        },
        resume_id: resume.id,
        generated_by_ai: upload.parsed.generated_by_ai,
    }))
}

async fn reload(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Organization slug, needed only when the same email exists in several tenants.
    #[serde(default)]
    pub org: Option<String>,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let email = req.email.trim().to_lowercase();
    if !check_rate_limit(&email, "login") {
        return Err(AppError::Forbidden("Too many login attempts".into()));
    }

    let candidates: Vec<User> = sqlx::query_as(
        r#"
        SELECT u.* FROM users u
        LEFT JOIN organizations o ON o.id = u.organization_id
        WHERE lower(u.email) = $1 AND ($2::text IS NULL OR o.slug = $2)
        ORDER BY u.created_at
        "#,
    )
    .bind(&email)
    .bind(req.org.as_deref().map(str::to_lowercase))
    .fetch_all(&state.db)
    .await?;

    let mut matched = None;
    for user in candidates {
        if verify_password_blocking(req.password.clone(), user.password_hash.clone()).await? {
            matched = Some(user);
            break;
        }
    }
    let user = matched.ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;
    if !user.user_active {
        return Err(AppError::Forbidden("Account is disabled".into()));
    }

    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;
    info!(user_id = %user.id, "User logged in");
    audit::record(
        &state.db,
        AuditEntry::new("login", "user")
            .by(user.id, user.organization_id)
            .resource(user.id),
    )
    .await;

    let token = issue_token(&state.config, &user)?;
    Ok(ApiResponse::ok(AuthResponse {
        token,
        user,
        organization: None,
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, AppError> {
    let user = auth.load(&state.db).await?;
    Ok(ApiResponse::ok(MeResponse { user }))
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Super admins only; admins always create inside their own organization.
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

/// POST /api/v1/auth/users
pub async fn handle_create_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateStaffRequest>,
) -> Result<Response, AppError> {
    auth.load(&state.db).await?;
    assignable_staff_role(auth.role, req.role)?;

    let organization_id = match auth.role {
        UserRole::SuperAdmin => req.organization_id.or(auth.organization_id),
        _ => auth.organization_id,
    }
    .ok_or_else(|| AppError::Validation("organization_id is required".into()))?;
    authorize(
        &auth.actor(),
        Resource::Organization(Some(organization_id)),
        Action::Administer,
    )
    .require()?;

    let account = NewAccount {
        username: Some(req.username.trim().to_string()),
        email: req.email.trim().to_string(),
        password: req.password,
        first_name: req.first_name.filter(|n| !n.trim().is_empty()),
        last_name: req.last_name.filter(|n| !n.trim().is_empty()),
        phone: None,
        source: RegistrationSource::Manual,
    };
    let user = create_staff_user(&state.db, auth.user_id, account, req.role, organization_id).await?;
    Ok(ApiResponse::created(json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::user;

    #[test]
    fn test_register_request_reads_signup_context() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"jane_doe","email":"jane@x.com","password":"p","first_name":"Jane",
                "last_name":"Doe","org":"techcorp","referrer_url":"https://techcorp.talentiq.com"}"#,
        )
        .unwrap();
        assert_eq!(req.context.org.as_deref(), Some("techcorp"));
        assert!(req.context.referrer_url.is_some());
        assert!(req.context.invitation_code.is_none());
    }

    #[test]
    fn test_parsed_names_must_validate() {
        let good = "Jane".to_string();
        let bad = "J4ne".to_string();
        assert_eq!(acceptable_name(Some(&good), "First name"), Some("Jane".into()));
        assert_eq!(acceptable_name(Some(&bad), "First name"), None);
        assert_eq!(acceptable_name(None, "First name"), None);
    }

    #[test]
    fn test_auth_response_hides_password_hash() {
        let json = serde_json::to_value(AuthResponse {
            token: "t".into(),
            user: User {
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
                ..user(UserRole::Candidate, None)
            },
            organization: None,
        })
        .unwrap();
        assert!(json["user"].get("password_hash").is_none());
        assert!(json.get("organization").is_none());
    }
}
