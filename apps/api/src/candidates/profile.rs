//! Self-service profile edits and visibility flags.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validation::{
    collect, normalize_phone, validate_linkedin_url, validate_name, validate_phone,
};
use crate::errors::AppError;
use crate::models::user::{Certification, Education, User, WorkExperience};

const MAX_BIO_CHARS: usize = 2_000;
const MAX_SKILLS: usize = 100;

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<Vec<WorkExperience>>,
    pub education: Option<Vec<Education>>,
    pub certifications: Option<Vec<Certification>>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut results = Vec::new();
        if let Some(first) = &self.first_name {
            results.push(validate_name(first.trim(), "First name"));
        }
        if let Some(last) = &self.last_name {
            results.push(validate_name(last.trim(), "Last name"));
        }
        if let Some(phone) = &self.phone {
            results.push(validate_phone(phone));
        }
        if let Some(url) = &self.linkedin_url {
            results.push(validate_linkedin_url(url.trim()));
        }
        if let Some(years) = self.experience_years {
            if !(0..=70).contains(&years) {
                results.push(Err("Experience years must be between 0 and 70".into()));
            }
        }
        if self.bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO_CHARS) {
            results.push(Err(format!(
                "Bio must be at most {MAX_BIO_CHARS} characters"
            )));
        }
        if self.skills.as_ref().is_some_and(|s| s.len() > MAX_SKILLS) {
            results.push(Err(format!("At most {MAX_SKILLS} skills are allowed")));
        }
        collect(results)
    }

    /// Trimmed, de-duplicated (case-insensitive) skill list.
    fn cleaned_skills(&self) -> Option<Vec<String>> {
        self.skills.as_ref().map(|skills| {
            let mut seen = std::collections::HashSet::new();
            skills
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
                .collect()
        })
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string())
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> Result<User, AppError> {
    update.validate()?;
    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET
            first_name       = COALESCE($2, first_name),
            last_name        = COALESCE($3, last_name),
            phone            = COALESCE($4, phone),
            location         = COALESCE($5, location),
            job_title        = COALESCE($6, job_title),
            bio              = COALESCE($7, bio),
            experience_years = COALESCE($8, experience_years),
            skills           = COALESCE($9, skills),
            experience       = COALESCE($10, experience),
            education        = COALESCE($11, education),
            certifications   = COALESCE($12, certifications),
            linkedin_url     = COALESCE($13, linkedin_url),
            portfolio_url    = COALESCE($14, portfolio_url),
            updated_at       = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(trimmed(&update.first_name))
    .bind(trimmed(&update.last_name))
    .bind(update.phone.as_deref().map(normalize_phone))
    .bind(trimmed(&update.location))
    .bind(trimmed(&update.job_title))
    .bind(trimmed(&update.bio))
    .bind(update.experience_years)
    .bind(update.cleaned_skills().map(Json))
    .bind(update.experience.clone().map(Json))
    .bind(update.education.clone().map(Json))
    .bind(update.certifications.clone().map(Json))
    .bind(trimmed(&update.linkedin_url))
    .bind(trimmed(&update.portfolio_url))
    .fetch_one(pool)
    .await?;
    Ok(user)
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VisibilityUpdate {
    pub public_profile_enabled: Option<bool>,
    pub cross_org_accessible: Option<bool>,
}

pub async fn update_visibility(
    pool: &PgPool,
    user_id: Uuid,
    update: VisibilityUpdate,
) -> Result<User, AppError> {
    if update.public_profile_enabled.is_none() && update.cross_org_accessible.is_none() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET
            public_profile_enabled = COALESCE($2, public_profile_enabled),
            cross_org_accessible   = COALESCE($3, cross_org_accessible),
            updated_at             = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(update.public_profile_enabled)
    .bind(update.cross_org_accessible)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn set_employee_status(
    pool: &PgPool,
    candidate_id: Uuid,
    is_employee: bool,
) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as(
        r#"
        UPDATE users SET is_organization_employee = $2, updated_at = now()
        WHERE id = $1 AND role = 'candidate'
        RETURNING *
        "#,
    )
    .bind(candidate_id)
    .bind(is_employee)
    .fetch_optional(pool)
    .await?;
    user.ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_valid() {
        assert!(ProfileUpdate::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_fields_are_collected() {
        let update = ProfileUpdate {
            first_name: Some("J".into()),
            phone: Some("123".into()),
            linkedin_url: Some("https://example.com/jane".into()),
            experience_years: Some(99),
            ..Default::default()
        };
        let Err(AppError::Validation(msg)) = update.validate() else {
            panic!("expected validation error");
        };
        assert!(msg.contains("First name"));
        assert!(msg.contains("at least 10 digits"));
        assert!(msg.contains("LinkedIn"));
        assert!(msg.contains("between 0 and 70"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let parsed: Result<ProfileUpdate, _> =
            serde_json::from_str(r#"{"role": "super_admin"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_skills_are_trimmed_and_deduplicated() {
        let update = ProfileUpdate {
            skills: Some(vec![" Rust ".into(), "rust".into(), "".into(), "SQL".into()]),
            ..Default::default()
        };
        assert_eq!(
            update.cleaned_skills(),
            Some(vec!["Rust".to_string(), "SQL".to_string()])
        );
    }
}
