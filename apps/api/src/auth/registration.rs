//! Candidate and staff account creation.
//!
//! Candidates land in an organization chosen by the signup link (`?org=<slug>`) when one is
//! given, otherwise by the assignment resolver. Staff accounts are created by an admin
//! inside their own organization.

use serde::Deserialize;
use serde_json::json;
use sqlx::{PgExecutor, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{self, AuditEntry};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::validation::{
    collect, normalize_phone, validate_email, validate_name, validate_password, validate_phone,
    validate_username,
};
use crate::errors::{is_unique_violation, AppError};
use crate::models::user::{RegistrationSource, User, UserRole};
use crate::organizations::resolver::organization_from_signup_context;
use crate::organizations::{assign_candidate_to_organization, Assignment, AssignmentSource, OrganizationStore};

/// Generated usernames get a random suffix this many times before giving up.
const USERNAME_ATTEMPTS: usize = 5;

/// Where the signup came from; every part is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupContext {
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub referrer_url: Option<String>,
    #[serde(default)]
    pub invitation_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub source: RegistrationSource,
}

/// Field checks shared by every registration path. Names are only checked when given.
pub fn validate_account(account: &NewAccount) -> Result<(), AppError> {
    let mut results = vec![validate_email(&account.email)];
    if let Some(username) = &account.username {
        results.push(validate_username(username));
    }
    if let Err(errors) = validate_password(&account.password, account.username.as_deref()) {
        results.push(Err(errors.join("; ")));
    }
    if let Some(first) = &account.first_name {
        results.push(validate_name(first, "First name"));
    }
    if let Some(last) = &account.last_name {
        results.push(validate_name(last, "Last name"));
    }
    if let Some(phone) = &account.phone {
        results.push(validate_phone(phone));
    }
    collect(results)
}

/// Username candidate from the local part of an email: `jane.doe+x@a.com` → `jane_doe_x`.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut name: String = local
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .take(20)
        .collect();
    if name.chars().filter(|c| *c != '_').count() < 3 {
        name = format!("user_{name}");
    }
    name
}

fn with_suffix(base: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}_{}", &suffix[..6])
}

async fn username_taken(
    pool: &PgPool,
    username: &str,
    organization_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower($1) AND organization_id = $2)",
    )
    .bind(username)
    .bind(organization_id)
    .fetch_one(pool)
    .await
}

async fn pick_username(
    pool: &PgPool,
    requested: Option<&str>,
    email: &str,
    organization_id: Uuid,
) -> Result<String, AppError> {
    if let Some(username) = requested {
        if username_taken(pool, username, organization_id).await? {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        return Ok(username.to_string());
    }

    let base = username_from_email(email);
    if !username_taken(pool, &base, organization_id).await? {
        return Ok(base);
    }
    for _ in 0..USERNAME_ATTEMPTS {
        let candidate = with_suffix(&base);
        if !username_taken(pool, &candidate, organization_id).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Conflict("Could not generate a unique username".into()))
}

/// Signup link first, then the resolver.
pub async fn resolve_organization(
    store: &dyn OrganizationStore,
    email: &str,
    context: &SignupContext,
) -> Result<Assignment, sqlx::Error> {
    if let Some(org) = organization_from_signup_context(store, context.org.as_deref()).await? {
        return Ok(Assignment::from_org(org, AssignmentSource::SignupLink));
    }
    assign_candidate_to_organization(
        store,
        email,
        context.referrer_url.as_deref(),
        context.invitation_code.as_deref(),
    )
    .await
}

/// Hashes on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

/// Verifies on the blocking pool. An unreadable stored hash counts as a mismatch.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    let result = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(result.unwrap_or_else(|e| {
        warn!("Stored password hash is unreadable: {e}");
        false
    }))
}

async fn insert_user<'e, E>(
    executor: E,
    id: Uuid,
    account: &NewAccount,
    username: &str,
    password_hash: &str,
    role: UserRole,
    organization_id: Uuid,
) -> Result<User, AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users
            (id, username, email, password_hash, role, organization_id,
             first_name, last_name, phone, registration_source)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(account.email.to_lowercase())
    .bind(password_hash)
    .bind(role)
    .bind(organization_id)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.phone.as_deref().map(normalize_phone))
    .bind(account.source)
    .fetch_one(executor)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
            "An account with this email or username already exists".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_email_free(
    pool: &PgPool,
    email: &str,
    organization_id: Uuid,
) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1) AND organization_id = $2)",
    )
    .bind(email)
    .bind(organization_id)
    .fetch_one(pool)
    .await?;
    if exists {
        return Err(AppError::Conflict(
            "An account with this email already exists".into(),
        ));
    }
    Ok(())
}

/// A candidate that passed validation and placement but has no row yet. The id is fixed
/// up front so uploads can be keyed to it before the insert.
#[derive(Debug, Clone)]
pub struct PreparedCandidate {
    pub id: Uuid,
    pub account: NewAccount,
    pub username: String,
    pub password_hash: String,
    pub assignment: Assignment,
}

/// Validates the account, picks the organization and a free username, and hashes the
/// password. Nothing is written.
pub async fn prepare_candidate(
    pool: &PgPool,
    store: &dyn OrganizationStore,
    account: NewAccount,
    context: &SignupContext,
) -> Result<PreparedCandidate, AppError> {
    validate_account(&account)?;

    let assignment = resolve_organization(store, &account.email, context).await?;
    ensure_email_free(pool, &account.email, assignment.organization_id).await?;
    let username = pick_username(
        pool,
        account.username.as_deref(),
        &account.email,
        assignment.organization_id,
    )
    .await?;
    let password_hash = hash_password_blocking(account.password.clone()).await?;

    Ok(PreparedCandidate {
        id: Uuid::new_v4(),
        account,
        username,
        password_hash,
        assignment,
    })
}

pub async fn insert_candidate<'e, E>(
    executor: E,
    prepared: &PreparedCandidate,
) -> Result<User, AppError>
where
    E: PgExecutor<'e>,
{
    insert_user(
        executor,
        prepared.id,
        &prepared.account,
        &prepared.username,
        &prepared.password_hash,
        UserRole::Candidate,
        prepared.assignment.organization_id,
    )
    .await
}

/// Logs and audits a committed candidate registration.
pub async fn record_registration(pool: &PgPool, user: &User, prepared: &PreparedCandidate) {
    let assignment = &prepared.assignment;
    info!(
        user_id = %user.id,
        organization = %assignment.organization_name,
        source = ?assignment.source,
        "Registered candidate"
    );
    audit::record(
        pool,
        AuditEntry::new("user_registered", "user")
            .by(user.id, user.organization_id)
            .resource(user.id)
            .details(json!({
                "registration_source": prepared.account.source,
                "assignment_source": assignment.source,
                "organization": assignment.organization_name,
            })),
    )
    .await;
}

/// Validates, places and stores a new candidate, then writes the audit entry.
pub async fn register_candidate(
    pool: &PgPool,
    store: &dyn OrganizationStore,
    account: NewAccount,
    context: &SignupContext,
) -> Result<(User, Assignment), AppError> {
    let prepared = prepare_candidate(pool, store, account, context).await?;
    let user = insert_candidate(pool, &prepared).await?;
    record_registration(pool, &user, &prepared).await;
    Ok((user, prepared.assignment))
}

/// Roles an admin may hand out. Only a super admin creates admins in other tenants.
pub fn assignable_staff_role(creator: UserRole, requested: UserRole) -> Result<(), AppError> {
    match (creator, requested) {
        (_, UserRole::Candidate) | (_, UserRole::SuperAdmin) => Err(AppError::Validation(
            "Staff accounts must be recruiter, admin or technical_person".into(),
        )),
        (UserRole::SuperAdmin, _) | (UserRole::Admin, _) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Only administrators can create staff accounts".into(),
        )),
    }
}

/// Creates a recruiter, admin or technical person inside `organization_id`.
pub async fn create_staff_user(
    pool: &PgPool,
    created_by: Uuid,
    account: NewAccount,
    role: UserRole,
    organization_id: Uuid,
) -> Result<User, AppError> {
    validate_account(&account)?;
    ensure_email_free(pool, &account.email, organization_id).await?;
    let username = pick_username(
        pool,
        account.username.as_deref(),
        &account.email,
        organization_id,
    )
    .await?;
    let password_hash = hash_password_blocking(account.password.clone()).await?;
    let user = insert_user(
        pool,
        Uuid::new_v4(),
        &account,
        &username,
        &password_hash,
        role,
        organization_id,
    )
    .await?;

    info!(user_id = %user.id, role = role.as_str(), "Created staff account");
    audit::record(
        pool,
        AuditEntry::new("staff_user_created", "user")
            .by(created_by, Some(organization_id))
            .resource(user.id)
            .details(json!({ "role": role, "email": user.email })),
    )
    .await;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::store::memory::MemoryOrganizationStore;

    fn account() -> NewAccount {
        NewAccount {
            username: Some("jane_doe".into()),
            email: "jane@techcorp.com".into(),
            password: "Str0ng!Pass".into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            phone: None,
            source: RegistrationSource::Manual,
        }
    }

    #[test]
    fn test_valid_account_passes() {
        assert!(validate_account(&account()).is_ok());
    }

    #[test]
    fn test_all_field_errors_are_reported_together() {
        let mut bad = account();
        bad.email = "not-an-email".into();
        bad.password = "short".into();
        bad.first_name = Some("J".into());
        let Err(AppError::Validation(msg)) = validate_account(&bad) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("valid email"));
        assert!(msg.contains("at least 8 characters"));
        assert!(msg.contains("First name"));
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("jane.doe+x@a.com"), "jane_doe_x");
        assert_eq!(username_from_email("Jo@a.com"), "user_jo");
        assert!(validate_username(&username_from_email("jane.doe@a.com")).is_ok());
        let long = username_from_email("averyveryverylongemaillocalpart@a.com");
        assert_eq!(long.len(), 20);
    }

    #[test]
    fn test_suffix_keeps_username_valid() {
        let name = with_suffix("jane_doe");
        assert!(name.starts_with("jane_doe_"));
        assert!(validate_username(&name).is_ok());
    }

    #[test]
    fn test_staff_roles() {
        assert!(assignable_staff_role(UserRole::Admin, UserRole::Recruiter).is_ok());
        assert!(assignable_staff_role(UserRole::Admin, UserRole::TechnicalPerson).is_ok());
        assert!(assignable_staff_role(UserRole::SuperAdmin, UserRole::Admin).is_ok());
        assert!(matches!(
            assignable_staff_role(UserRole::Admin, UserRole::SuperAdmin),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            assignable_staff_role(UserRole::Recruiter, UserRole::Recruiter),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_password_blocking() {
        let hash = hash_password_blocking("Str0ng!Pass".into()).await.unwrap();
        assert!(verify_password_blocking("Str0ng!Pass".into(), hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("wrong".into(), hash).await.unwrap());
        assert!(!verify_password_blocking("Str0ng!Pass".into(), "garbage".into())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_signup_link_wins_over_email_domain() {
        let store = MemoryOrganizationStore::with(&[
            ("TechCorp Solutions", "techcorp"),
            ("StartupXY", "startupxy"),
        ]);
        let context = SignupContext {
            org: Some("StartupXY".into()),
            ..Default::default()
        };
        let assignment = resolve_organization(&store, "jane@techcorp.com", &context)
            .await
            .unwrap();
        assert_eq!(assignment.organization_name, "StartupXY");
        assert_eq!(assignment.source, AssignmentSource::SignupLink);
    }

    #[tokio::test]
    async fn test_unknown_signup_slug_falls_through_to_resolver() {
        let store = MemoryOrganizationStore::with(&[("TechCorp Solutions", "techcorp")]);
        let context = SignupContext {
            org: Some("nope".into()),
            ..Default::default()
        };
        let assignment = resolve_organization(&store, "jane@techcorp.com", &context)
            .await
            .unwrap();
        assert_eq!(assignment.organization_name, "TechCorp Solutions");
        assert_eq!(assignment.source, AssignmentSource::EmailDomain);
    }
}
