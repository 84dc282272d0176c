//! Resume pipeline: extract text, parse it into a profile, copy the profile onto the user.

use bytes::Bytes;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::ai::resume_parse::{parse_resume_structured, ParsedResume};
use crate::ai::AiOutcome;
use crate::errors::AppError;
use crate::llm_client::ChatCompletion;
use crate::models::artifacts::Resume;
use crate::models::user::{Certification, Education, WorkExperience};
use crate::resumes::extract::extract_text_from_bytes;
use crate::resumes::uploads::{content_type_for, UploadKind, UploadedFile};
use crate::storage::{object_key, with_stored_object, ObjectStore};

#[derive(Debug)]
pub struct ParsedUpload {
    pub text: String,
    pub parsed: AiOutcome<ParsedResume>,
}

/// Extracts text from an uploaded resume and parses it. Fails only when no text could
/// be read from the document.
pub async fn parse_resume_file(
    client: &dyn ChatCompletion,
    bytes: Bytes,
    filename: &str,
) -> Result<ParsedUpload, AppError> {
    let text = extract_text_from_bytes(bytes, filename.to_string()).await;
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Could not extract text from document".into(),
        ));
    }
    let parsed = parse_resume_structured(client, &text).await;
    info!(
        filename,
        chars = text.len(),
        generated_by_ai = parsed.generated_by_ai,
        "Parsed resume"
    );
    Ok(ParsedUpload { text, parsed })
}

/// Records the parse of a stored file and points the user's `resume_key` at it.
pub async fn insert_resume(
    conn: &mut PgConnection,
    user_id: Uuid,
    key: &str,
    file: &UploadedFile,
    upload: &ParsedUpload,
) -> Result<Resume, AppError> {
    let parsed_data =
        serde_json::to_value(&upload.parsed.value).map_err(|e| AppError::Internal(e.into()))?;
    let resume: Resume = sqlx::query_as(
        r#"
        INSERT INTO resumes
            (id, user_id, original_filename, storage_key, extracted_text, parsed_data, generated_by_ai)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&file.filename)
    .bind(key)
    .bind(&upload.text)
    .bind(&parsed_data)
    .bind(upload.parsed.generated_by_ai)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE users SET resume_key = $1, updated_at = now() WHERE id = $2")
        .bind(key)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(resume)
}

/// Stores the original file, then records it in one transaction. The object is removed
/// again if the rows cannot be written.
pub async fn save_resume(
    pool: &PgPool,
    storage: &dyn ObjectStore,
    user_id: Uuid,
    file: &UploadedFile,
    upload: &ParsedUpload,
) -> Result<Resume, AppError> {
    let key = object_key(UploadKind::Resume.storage_prefix(), user_id, &file.extension);
    let key_ref = key.as_str();
    with_stored_object(
        storage,
        &key,
        file.bytes.clone(),
        content_type_for(&file.extension),
        move || async move {
            let mut tx = pool.begin().await?;
            let resume = insert_resume(&mut tx, user_id, key_ref, file, upload).await?;
            tx.commit().await?;
            Ok::<_, AppError>(resume)
        },
    )
    .await
}

/// Non-empty parsed fields, ready to overlay on a user row. `None` keeps the stored value.
/// The email is never part of the patch: it is the login identity.
#[derive(Debug, Default, PartialEq)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<Vec<WorkExperience>>,
    pub education: Option<Vec<Education>>,
    pub certifications: Option<Vec<Certification>>,
}

fn non_empty<T>(items: &[T]) -> Option<Vec<T>>
where
    T: Clone,
{
    (!items.is_empty()).then(|| items.to_vec())
}

impl ProfilePatch {
    pub fn from_parsed(parsed: &ParsedResume) -> Self {
        let info = &parsed.personal_info;
        let summary = &parsed.professional_summary;
        Self {
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
            phone: info.phone.clone(),
            location: info.location.clone(),
            linkedin_url: info.linkedin_url.clone(),
            portfolio_url: info.portfolio_url.clone(),
            job_title: summary.current_job_title.clone(),
            bio: summary.bio.clone(),
            experience_years: summary.experience_years,
            skills: non_empty(&parsed.skills),
            experience: non_empty(&parsed.work_experience),
            education: non_empty(&parsed.education),
            certifications: non_empty(&parsed.certifications),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Copies the non-empty parts of `parsed` onto the user's profile.
pub async fn populate_profile(
    pool: &PgPool,
    user_id: Uuid,
    parsed: &ParsedResume,
) -> Result<(), sqlx::Error> {
    let patch = ProfilePatch::from_parsed(parsed);
    if patch.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE users SET
            first_name       = COALESCE($2, first_name),
            last_name        = COALESCE($3, last_name),
            phone            = COALESCE($4, phone),
            location         = COALESCE($5, location),
            linkedin_url     = COALESCE($6, linkedin_url),
            portfolio_url    = COALESCE($7, portfolio_url),
            job_title        = COALESCE($8, job_title),
            bio              = COALESCE($9, bio),
            experience_years = COALESCE($10, experience_years),
            skills           = COALESCE($11, skills),
            experience       = COALESCE($12, experience),
            education        = COALESCE($13, education),
            certifications   = COALESCE($14, certifications),
            updated_at       = now()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(patch.first_name)
    .bind(patch.last_name)
    .bind(patch.phone)
    .bind(patch.location)
    .bind(patch.linkedin_url)
    .bind(patch.portfolio_url)
    .bind(patch.job_title)
    .bind(patch.bio)
    .bind(patch.experience_years)
    .bind(patch.skills.map(Json))
    .bind(patch.experience.map(Json))
    .bind(patch.education.map(Json))
    .bind(patch.certifications.map(Json))
    .execute(pool)
    .await?;

    info!(%user_id, "Populated profile from resume");
    Ok(())
}
