//! The recruiter-facing candidate pool.
//!
//! A recruiter sees every active candidate of their own organization plus candidates of
//! other organizations that made their profile public and cross-organization accessible.
//! Each row is tagged with how the viewer came to see it.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    OrganizationEmployee,
    OrganizationAffiliated,
    CrossOrganization,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::OrganizationEmployee => "organization_employee",
            AccessType::OrganizationAffiliated => "organization_affiliated",
            AccessType::CrossOrganization => "cross_organization",
        }
    }
}

/// How a viewer in `viewer_org` relates to a candidate.
pub fn classify(viewer_org: Option<Uuid>, candidate: &User) -> AccessType {
    match (viewer_org, candidate.organization_id) {
        (Some(v), Some(c)) if v == c && candidate.is_organization_employee => {
            AccessType::OrganizationEmployee
        }
        (Some(v), Some(c)) if v == c => AccessType::OrganizationAffiliated,
        _ => AccessType::CrossOrganization,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolFilters {
    /// Matches name, email and job title.
    #[serde(default)]
    pub search: Option<String>,
    /// Comma-separated; a candidate matches when they list any of them.
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub access_type: Option<AccessType>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
}

impl PoolFilters {
    pub fn skill_list(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// (limit, offset) with a 1-based page.
    pub fn limits(&self) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1) * per_page)
    }
}

fn like_pattern(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| format!("%{}%", v.replace('%', "\\%").replace('_', "\\_")))
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    pub organization_id: Option<Uuid>,
    pub photo_key: Option<String>,
    pub access_type: AccessType,
}

impl CandidateSummary {
    pub fn from_user(user: User, viewer_org: Option<Uuid>) -> Self {
        let access_type = classify(viewer_org, &user);
        Self {
            name: user.full_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            job_title: user.job_title,
            location: user.location,
            experience_years: user.experience_years,
            skills: user.skills.0,
            organization_id: user.organization_id,
            photo_key: user.photo_key,
            access_type,
        }
    }
}

/// Candidates visible to a viewer in `viewer_org`. `all_tenants` lifts the organization
/// restriction (super admin).
pub async fn search_pool(
    pool: &PgPool,
    viewer_org: Option<Uuid>,
    all_tenants: bool,
    filters: &PoolFilters,
) -> Result<Vec<CandidateSummary>, sqlx::Error> {
    let (limit, offset) = filters.limits();
    let users: Vec<User> = sqlx::query_as(
        r#"
        SELECT * FROM users
        WHERE role = 'candidate' AND user_active
          AND ($2 OR organization_id = $1 OR (public_profile_enabled AND cross_org_accessible))
          AND ($3::text IS NULL
               OR first_name ILIKE $3 OR last_name ILIKE $3
               OR email ILIKE $3 OR job_title ILIKE $3)
          AND ($4::text IS NULL OR location ILIKE $4)
          AND (cardinality($5::text[]) = 0 OR EXISTS (
                SELECT 1 FROM jsonb_array_elements_text(skills) s WHERE lower(s) = ANY($5)))
          AND (CASE $6::text
                WHEN 'organization_employee'
                    THEN organization_id = $1 AND is_organization_employee
                WHEN 'organization_affiliated'
                    THEN organization_id = $1 AND NOT is_organization_employee
                WHEN 'cross_organization'
                    THEN organization_id IS DISTINCT FROM $1
                ELSE TRUE
               END)
        ORDER BY created_at DESC
        LIMIT $7 OFFSET $8
        "#,
    )
    .bind(viewer_org)
    .bind(all_tenants)
    .bind(like_pattern(filters.search.as_deref()))
    .bind(like_pattern(filters.location.as_deref()))
    .bind(filters.skill_list())
    .bind(filters.access_type.map(|a| a.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(users
        .into_iter()
        .map(|u| CandidateSummary::from_user(u, viewer_org))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::user;
    use crate::models::user::UserRole;

    #[test]
    fn test_classify_relative_to_viewer() {
        let org = Uuid::new_v4();
        let mut employee = user(UserRole::Candidate, Some(org));
        employee.is_organization_employee = true;
        let affiliated = user(UserRole::Candidate, Some(org));
        let outsider = user(UserRole::Candidate, Some(Uuid::new_v4()));

        assert_eq!(classify(Some(org), &employee), AccessType::OrganizationEmployee);
        assert_eq!(classify(Some(org), &affiliated), AccessType::OrganizationAffiliated);
        assert_eq!(classify(Some(org), &outsider), AccessType::CrossOrganization);
        // A viewer without a tenant relates to nobody.
        assert_eq!(classify(None, &employee), AccessType::CrossOrganization);
    }

    #[test]
    fn test_summary_uses_full_name() {
        let summary = CandidateSummary::from_user(user(UserRole::Candidate, None), None);
        assert_eq!(summary.name, "Jane Doe");
        assert_eq!(summary.access_type, AccessType::CrossOrganization);
    }

    #[test]
    fn test_filters_parse_and_normalize() {
        let filters: PoolFilters = serde_json::from_value(serde_json::json!({
            "skills": " Rust, python ,,",
            "access_type": "cross_organization",
            "page": 3,
            "per_page": 500
        }))
        .unwrap();
        assert_eq!(filters.skill_list(), vec!["rust", "python"]);
        assert_eq!(filters.access_type, Some(AccessType::CrossOrganization));
        assert_eq!(filters.limits(), (MAX_PAGE_SIZE, 2 * MAX_PAGE_SIZE));
    }

    #[test]
    fn test_default_limits() {
        assert_eq!(PoolFilters::default().limits(), (DEFAULT_PAGE_SIZE, 0));
        let zero_page = PoolFilters {
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(zero_page.limits().1, 0);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some(" 100%_ ")).as_deref(), Some("%100\\%\\_%"));
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
