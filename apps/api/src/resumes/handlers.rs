use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Json as SqlJson;
use tracing::warn;
use uuid::Uuid;

use crate::ai::cover_letter::{
    analyze_cover_letter, available_templates, generate_cover_letter, is_known_template,
    CandidateInfo, CoverLetterAnalysis, CoverLetterDraft, JobDetails, TemplateSummary,
};
use crate::ai::cv_analysis::{analyze_cv, CvAnalysis};
use crate::ai::sentiment::{analyze_sentiment, Sentiment};
use crate::ai::video::{analyze_video_interview, VideoInsights};
use crate::ai::AiOutcome;
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::artifacts::{CoverLetter, CvAnalysisRecord, Resume};
use crate::resumes::extract::extract_text_from_bytes;
use crate::resumes::service::{parse_resume_file, populate_profile, save_resume};
use crate::resumes::uploads::{content_type_for, read_upload, UploadKind};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{object_key, with_stored_object};

const TONES: &[&str] = &["professional", "enthusiastic", "confident", "friendly"];
const MAX_COVER_LETTER_CHARS: usize = 20_000;
const MAX_SENTIMENT_CHARS: usize = 5_000;

#[derive(Serialize)]
pub struct ResumeUploadResponse {
    pub resume: Resume,
    pub profile_updated: bool,
}

/// POST /api/v1/resumes/upload
///
/// Multipart field `resume`. The file is stored, parsed, and the parsed fields are
/// copied onto the caller's profile.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let user = auth.load(&state.db).await?;
    let (file, _) = read_upload(multipart, "resume", UploadKind::Resume)
        .await?
        .require_file()?;

    let upload = parse_resume_file(state.ai.as_ref(), file.bytes.clone(), &file.filename).await?;
    let resume = save_resume(&state.db, state.storage.as_ref(), user.id, &file, &upload).await?;

    // The upload is kept even when the profile copy fails.
    let profile_updated = match populate_profile(&state.db, user.id, &upload.parsed.value).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %user.id, "Could not populate profile from resume: {e}");
            false
        }
    };

    audit::record(
        &state.db,
        AuditEntry::new("resume_uploaded", "resume")
            .by(user.id, user.organization_id)
            .resource(resume.id)
            .details(json!({
                "filename": file.filename,
                "generated_by_ai": resume.generated_by_ai,
            })),
    )
    .await;

    Ok(ApiResponse::created(ResumeUploadResponse {
        resume,
        profile_updated,
    }))
}

#[derive(Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<Resume>,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<ResumeListResponse>>, AppError> {
    let resumes: Vec<Resume> =
        sqlx::query_as("SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(auth.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(ApiResponse::ok(ResumeListResponse { resumes }))
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub job: JobDetails,
    #[serde(default = "default_template")]
    pub template_type: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_template() -> String {
    "custom".to_string()
}

fn default_tone() -> String {
    "professional".to_string()
}

fn validate_cover_letter_request(req: &CoverLetterRequest) -> Result<(), AppError> {
    if req.job.company.trim().is_empty() || req.job.position.trim().is_empty() {
        return Err(AppError::Validation(
            "Company name and job title are required".into(),
        ));
    }
    if !is_known_template(&req.template_type) {
        return Err(AppError::Validation(format!(
            "Unknown template '{}'",
            req.template_type
        )));
    }
    if !TONES.contains(&req.tone.as_str()) {
        return Err(AppError::Validation(format!(
            "Tone must be one of: {}",
            TONES.join(", ")
        )));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct CoverLetterResponse {
    pub cover_letter: CoverLetter,
    pub draft: AiOutcome<CoverLetterDraft>,
}

/// POST /api/v1/cover-letters
pub async fn handle_create_cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Response, AppError> {
    validate_cover_letter_request(&req)?;
    let user = auth.load(&state.db).await?;

    let candidate = CandidateInfo {
        name: user.full_name(),
        skills: user.skills.0.clone(),
        experience: user.experience.0.clone(),
        education: user.education.0.clone(),
    };
    let draft = generate_cover_letter(
        state.ai.as_ref(),
        &candidate,
        &req.job,
        &req.template_type,
        &req.tone,
    )
    .await;

    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| draft.value.title.clone());
    let cover_letter: CoverLetter = sqlx::query_as(
        r#"
        INSERT INTO cover_letters
            (id, user_id, title, company_name, job_title, content, template_type, tone,
             key_points, suggestions, generated_by_ai, generation_model)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&title)
    .bind(&req.job.company)
    .bind(&req.job.position)
    .bind(&draft.value.content)
    .bind(&draft.value.template_type)
    .bind(&req.tone)
    .bind(SqlJson(&draft.value.key_points))
    .bind(SqlJson(&draft.value.suggestions))
    .bind(draft.generated_by_ai)
    .bind(&draft.value.generation_model)
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::created(CoverLetterResponse {
        cover_letter,
        draft,
    }))
}

#[derive(Serialize)]
pub struct CoverLetterListResponse {
    pub cover_letters: Vec<CoverLetter>,
}

/// GET /api/v1/cover-letters
pub async fn handle_list_cover_letters(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CoverLetterListResponse>>, AppError> {
    let cover_letters: Vec<CoverLetter> =
        sqlx::query_as("SELECT * FROM cover_letters WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(auth.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(ApiResponse::ok(CoverLetterListResponse { cover_letters }))
}

#[derive(Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
}

/// GET /api/v1/cover-letters/templates
pub async fn handle_cover_letter_templates(
    _auth: AuthUser,
) -> Json<ApiResponse<TemplateListResponse>> {
    ApiResponse::ok(TemplateListResponse {
        templates: available_templates(),
    })
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeCoverLetterRequest {
    pub cover_letter: String,
    #[serde(default)]
    pub requirements: String,
}

#[derive(Serialize)]
pub struct CoverLetterAnalysisResponse {
    pub analysis: AiOutcome<CoverLetterAnalysis>,
}

/// POST /api/v1/cover-letters/analyze
pub async fn handle_analyze_cover_letter(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<AnalyzeCoverLetterRequest>,
) -> Result<Json<ApiResponse<CoverLetterAnalysisResponse>>, AppError> {
    let text = req.cover_letter.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Cover letter text is required".into()));
    }
    if text.chars().count() > MAX_COVER_LETTER_CHARS {
        return Err(AppError::Validation("Cover letter is too long".into()));
    }
    let analysis = analyze_cover_letter(state.ai.as_ref(), text, &req.requirements).await;
    Ok(ApiResponse::ok(CoverLetterAnalysisResponse { analysis }))
}

#[derive(Serialize)]
pub struct CvAnalysisResponse {
    pub id: Uuid,
    pub file_name: String,
    pub analysis: AiOutcome<CvAnalysis>,
}

/// POST /api/v1/cv-analysis
///
/// Multipart field `cv`. The analysis is persisted per user.
pub async fn handle_cv_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CvAnalysisResponse>>, AppError> {
    let user = auth.load(&state.db).await?;
    let (file, _) = read_upload(multipart, "cv", UploadKind::Resume)
        .await?
        .require_file()?;

    let text = extract_text_from_bytes(file.bytes, file.filename.clone()).await;
    let analysis = analyze_cv(state.ai.as_ref(), &text, &user.full_name()).await;

    let record: CvAnalysisRecord = sqlx::query_as(
        r#"
        INSERT INTO cv_analyses (id, user_id, file_name, overall_score, analysis, generated_by_ai)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&file.filename)
    .bind(f64::from(analysis.value.overall_score))
    .bind(serde_json::to_value(&analysis.value).map_err(|e| AppError::Internal(e.into()))?)
    .bind(analysis.generated_by_ai)
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::ok(CvAnalysisResponse {
        id: record.id,
        file_name: record.file_name,
        analysis,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SentimentResponse {
    pub sentiment: AiOutcome<Sentiment>,
}

/// POST /api/v1/sentiment
pub async fn handle_sentiment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<SentimentRequest>,
) -> Result<Json<ApiResponse<SentimentResponse>>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Text is required".into()));
    }
    let excerpt: String = text.chars().take(MAX_SENTIMENT_CHARS).collect();
    let sentiment = analyze_sentiment(state.ai.as_ref(), &excerpt).await;
    Ok(ApiResponse::ok(SentimentResponse { sentiment }))
}

#[derive(Serialize)]
pub struct PhotoUploadResponse {
    pub photo_key: String,
}

/// POST /api/v1/uploads/photo
pub async fn handle_upload_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<ApiResponse<PhotoUploadResponse>>, AppError> {
    let user = auth.load(&state.db).await?;
    let (file, _) = read_upload(multipart, "photo", UploadKind::Photo)
        .await?
        .require_file()?;

    let key = object_key(UploadKind::Photo.storage_prefix(), user.id, &file.extension);
    let (db, key_ref, user_id) = (&state.db, key.as_str(), user.id);
    with_stored_object(
        state.storage.as_ref(),
        &key,
        file.bytes,
        content_type_for(&file.extension),
        move || async move {
            sqlx::query("UPDATE users SET photo_key = $1, updated_at = now() WHERE id = $2")
                .bind(key_ref)
                .bind(user_id)
                .execute(db)
                .await?;
            Ok::<_, AppError>(())
        },
    )
    .await?;

    Ok(ApiResponse::ok(PhotoUploadResponse { photo_key: key }))
}

#[derive(Serialize)]
pub struct VideoUploadResponse {
    pub video_key: String,
    pub insights: AiOutcome<VideoInsights>,
}

/// POST /api/v1/uploads/video
///
/// Multipart field `video` plus optional `interview_id` and `context` text fields.
/// The recording is stored as-is; insights come from the interview context only.
pub async fn handle_upload_video(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let user = auth.load(&state.db).await?;
    let form = read_upload(multipart, "video", UploadKind::Video).await?;
    let interview_id = form
        .field("interview_id")
        .map(|v| {
            v.parse::<Uuid>()
                .map_err(|_| AppError::Validation("interview_id must be a UUID".into()))
        })
        .transpose()?;
    let context = form.field("context").map(str::to_string);
    let (file, _) = form.require_file()?;

    let key = object_key(UploadKind::Video.storage_prefix(), user.id, &file.extension);
    state
        .storage
        .put(&key, file.bytes, content_type_for(&file.extension))
        .await?;

    let insights = analyze_video_interview(state.ai.as_ref(), context.as_deref()).await;

    audit::record(
        &state.db,
        AuditEntry::new("video_uploaded", "video")
            .by(user.id, user.organization_id)
            .resource(&key)
            .details(json!({
                "interview_id": interview_id,
                "confidence": insights.value.confidence,
                "generated_by_ai": insights.generated_by_ai,
            })),
    )
    .await;

    Ok(ApiResponse::created(VideoUploadResponse {
        video_key: key,
        insights,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(template: &str, tone: &str) -> CoverLetterRequest {
        CoverLetterRequest {
            job: JobDetails {
                company: "Acme".into(),
                position: "Backend Engineer".into(),
                ..Default::default()
            },
            template_type: template.into(),
            tone: tone.into(),
            title: None,
        }
    }

    #[test]
    fn test_cover_letter_request_defaults() {
        let req: CoverLetterRequest =
            serde_json::from_str(r#"{"job": {"company": "Acme", "position": "SRE"}}"#).unwrap();
        assert_eq!(req.template_type, "custom");
        assert_eq!(req.tone, "professional");
        assert!(validate_cover_letter_request(&req).is_ok());
    }

    #[test]
    fn test_cover_letter_request_rejects_unknown_template_and_tone() {
        assert!(validate_cover_letter_request(&request("google", "confident")).is_ok());
        assert!(validate_cover_letter_request(&request("netflix", "confident")).is_err());
        assert!(validate_cover_letter_request(&request("custom", "sarcastic")).is_err());
    }

    #[test]
    fn test_cover_letter_request_requires_company_and_position() {
        let mut req = request("custom", "professional");
        req.job.company = "  ".into();
        assert!(matches!(
            validate_cover_letter_request(&req),
            Err(AppError::Validation(_))
        ));
    }
}
