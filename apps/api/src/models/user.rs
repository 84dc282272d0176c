use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Candidate,
    Recruiter,
    Admin,
    SuperAdmin,
    TechnicalPerson,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Candidate => "candidate",
            UserRole::Recruiter => "recruiter",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
            UserRole::TechnicalPerson => "technical_person",
        }
    }

    /// Recruiter, admin and super admin accounts manage interviews.
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            UserRole::Recruiter | UserRole::Admin | UserRole::SuperAdmin
        )
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(UserRole::Candidate),
            "recruiter" => Ok(UserRole::Recruiter),
            "admin" => Ok(UserRole::Admin),
            "super_admin" => Ok(UserRole::SuperAdmin),
            "technical_person" => Ok(UserRole::TechnicalPerson),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationSource {
    Manual,
    Quick,
    ResumeUpload,
    Social,
}

/// One entry of the `experience` profile blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
}

/// One entry of the `education` profile blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Json<Vec<String>>,
    pub experience: Json<Vec<WorkExperience>>,
    pub education: Json<Vec<Education>>,
    pub certifications: Json<Vec<Certification>>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub resume_key: Option<String>,
    pub photo_key: Option<String>,
    pub is_organization_employee: bool,
    pub public_profile_enabled: bool,
    pub cross_org_accessible: bool,
    pub user_active: bool,
    pub registration_source: RegistrationSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.to_string(),
            (None, Some(l)) => l.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

#[cfg(test)]
pub mod fixtures {
    use chrono::Utc;

    use super::*;

    /// Active user with an empty profile.
    pub fn user(role: UserRole, organization_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "jane_doe".into(),
            email: "jane@techcorp.com".into(),
            password_hash: String::new(),
            role,
            organization_id,
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            phone: None,
            location: None,
            job_title: None,
            bio: None,
            experience_years: None,
            skills: Json(Vec::new()),
            experience: Json(Vec::new()),
            education: Json(Vec::new()),
            certifications: Json(Vec::new()),
            linkedin_url: None,
            portfolio_url: None,
            resume_key: None,
            photo_key: None,
            is_organization_employee: false,
            public_profile_enabled: true,
            cross_org_accessible: true,
            user_active: true,
            registration_source: RegistrationSource::Manual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }
}
