//! Interview lifecycle: creation, listing, question generation and applications.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::access::policy::{interview_visibility, CandidateInterviewFacts, InterviewAccess};
use crate::ai::questions::{generate_interview_questions, QuestionSet, DEFAULT_QUESTIONS};
use crate::ai::AiOutcome;
use crate::errors::{is_unique_violation, AppError};
use crate::llm_client::ChatCompletion;
use crate::models::interview::{
    ApplicationStatus, Interview, InterviewApplication, InterviewQuestion, InterviewType,
    InvitationStatus, ScheduleStatus,
};
use crate::models::user::{User, UserRole};

const MAX_TITLE_CHARS: usize = 200;
const MIN_DURATION_MINUTES: i32 = 5;
const MAX_DURATION_MINUTES: i32 = 240;

fn default_duration() -> i32 {
    30
}

fn default_interview_type() -> InterviewType {
    InterviewType::Public
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInterviewRequest {
    pub title: String,
    pub job_description: String,
    /// Supplied questions; when absent the questions are generated.
    #[serde(default)]
    pub questions: Option<Vec<InterviewQuestion>>,
    #[serde(default)]
    pub num_questions: Option<usize>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default = "default_interview_type")]
    pub interview_type: InterviewType,
    #[serde(default)]
    pub cross_org_accessible: bool,
    #[serde(default)]
    pub public_invitation_enabled: bool,
}

impl NewInterviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "Title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
        if self.job_description.trim().is_empty() {
            return Err(AppError::Validation("Job description is required".into()));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(AppError::Validation(format!(
                "Duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if let Some(questions) = &self.questions {
            if questions.iter().any(|q| q.text.trim().is_empty()) {
                return Err(AppError::Validation("Questions must not be blank".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedInterview {
    pub interview: Interview,
    /// `None` when the caller supplied the questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_generated_by_ai: Option<bool>,
}

pub async fn create_interview(
    pool: &PgPool,
    client: &dyn ChatCompletion,
    recruiter_id: Uuid,
    organization_id: Uuid,
    req: NewInterviewRequest,
) -> Result<CreatedInterview, AppError> {
    req.validate()?;

    let (questions, generated) = match req.questions.filter(|q| !q.is_empty()) {
        Some(questions) => (questions, None),
        None => {
            let outcome = generate_interview_questions(
                client,
                &req.title,
                &req.job_description,
                req.num_questions.unwrap_or(DEFAULT_QUESTIONS),
            )
            .await;
            (outcome.value.questions, Some(outcome.generated_by_ai))
        }
    };

    let interview: Interview = sqlx::query_as(
        r#"
        INSERT INTO interviews
            (id, title, job_description, questions, duration_minutes, recruiter_id,
             organization_id, interview_type, cross_org_accessible, public_invitation_enabled)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.title.trim())
    .bind(req.job_description.trim())
    .bind(Json(&questions))
    .bind(req.duration_minutes)
    .bind(recruiter_id)
    .bind(organization_id)
    .bind(req.interview_type)
    .bind(req.cross_org_accessible)
    .bind(req.public_invitation_enabled)
    .fetch_one(pool)
    .await?;

    info!(
        interview_id = %interview.id,
        organization_id = %organization_id,
        questions = questions.len(),
        "Interview created"
    );
    Ok(CreatedInterview {
        interview,
        questions_generated_by_ai: generated,
    })
}

pub async fn load_interview(pool: &PgPool, id: Uuid) -> Result<Interview, AppError> {
    let interview: Option<Interview> = sqlx::query_as("SELECT * FROM interviews WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    interview.ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))
}

/// Interviews owned by an organization, or every interview for `None`.
pub async fn list_for_staff(
    pool: &PgPool,
    organization_id: Option<Uuid>,
) -> Result<Vec<Interview>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM interviews
        WHERE $1::uuid IS NULL OR organization_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, FromRow)]
struct CandidateInterviewRow {
    #[sqlx(flatten)]
    interview: Interview,
    application_status: Option<ApplicationStatus>,
    invitation_status: Option<InvitationStatus>,
    schedule_status: Option<ScheduleStatus>,
    has_response: bool,
}

/// One interview as a candidate sees it in their list.
#[derive(Debug, Serialize)]
pub struct CandidateInterview {
    pub id: Uuid,
    pub title: String,
    pub job_description: String,
    pub duration_minutes: i32,
    pub interview_type: InterviewType,
    pub organization_id: Uuid,
    pub can_take: bool,
    pub access_reason: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_status: Option<InvitationStatus>,
}

impl CandidateInterview {
    fn from_row(row: CandidateInterviewRow) -> Self {
        let facts = CandidateInterviewFacts {
            application_status: row.application_status,
            invitation_status: row.invitation_status,
            schedule_status: row.schedule_status,
            has_response: row.has_response,
        };
        let decision = interview_visibility(&InterviewAccess::from(&row.interview), &facts);
        let interview = row.interview;
        Self {
            id: interview.id,
            title: interview.title,
            job_description: interview.job_description,
            duration_minutes: interview.duration_minutes,
            interview_type: interview.interview_type,
            organization_id: interview.organization_id,
            can_take: decision.allowed && !facts.has_response,
            access_reason: decision.reason,
            completed: facts.has_response,
            application_status: facts.application_status,
            invitation_status: facts.invitation_status,
        }
    }
}

/// Active interviews listed for a candidate: public ones from their organization or shared
/// beyond it, plus any they already have a record for.
pub async fn list_for_candidate(
    pool: &PgPool,
    candidate: &User,
) -> Result<Vec<CandidateInterview>, sqlx::Error> {
    let rows: Vec<CandidateInterviewRow> = sqlx::query_as(
        r#"
        SELECT i.*,
               a.status   AS application_status,
               inv.status AS invitation_status,
               s.status   AS schedule_status,
               EXISTS (SELECT 1 FROM interview_responses r
                        WHERE r.interview_id = i.id AND r.candidate_id = $1) AS has_response
        FROM interviews i
        LEFT JOIN interview_applications a
               ON a.interview_id = i.id AND a.candidate_id = $1
        LEFT JOIN interview_invitations inv
               ON inv.interview_id = i.id AND inv.candidate_id = $1
        LEFT JOIN LATERAL (
               SELECT status FROM interview_schedules
                WHERE interview_id = i.id AND candidate_id = $1
                ORDER BY (status = 'scheduled') DESC, scheduled_at DESC
                LIMIT 1) s ON TRUE
        WHERE i.is_active
          AND ((i.interview_type = 'public'
                AND (i.organization_id = $2 OR i.cross_org_accessible
                     OR i.public_invitation_enabled))
               OR a.id IS NOT NULL OR inv.id IS NOT NULL OR s.status IS NOT NULL)
        ORDER BY i.created_at DESC
        "#,
    )
    .bind(candidate.id)
    .bind(candidate.organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CandidateInterview::from_row).collect())
}

/// Regenerates and stores the questions of an existing interview.
pub async fn regenerate_questions(
    pool: &PgPool,
    client: &dyn ChatCompletion,
    interview: &Interview,
    n: usize,
) -> Result<AiOutcome<QuestionSet>, AppError> {
    let outcome =
        generate_interview_questions(client, &interview.title, &interview.job_description, n)
            .await;
    sqlx::query("UPDATE interviews SET questions = $2 WHERE id = $1")
        .bind(interview.id)
        .bind(Json(&outcome.value.questions))
        .execute(pool)
        .await?;
    Ok(outcome)
}

/// Whether `candidate` may apply to `interview`: active public interviews published by
/// their own organization or shared across organizations.
pub fn check_application(interview: &Interview, candidate: &User) -> Result<(), AppError> {
    if candidate.role != UserRole::Candidate {
        return Err(AppError::Forbidden("Only candidates can apply".into()));
    }
    if !interview.is_active {
        return Err(AppError::Validation("Interview is no longer active".into()));
    }
    if interview.interview_type != InterviewType::Public {
        return Err(AppError::Validation(
            "Only public interviews accept applications".into(),
        ));
    }
    let same_org = candidate.organization_id == Some(interview.organization_id);
    if !(same_org || interview.cross_org_accessible || interview.public_invitation_enabled) {
        return Err(AppError::Forbidden(
            "Interview is not open to your organization".into(),
        ));
    }
    Ok(())
}

pub async fn apply(
    pool: &PgPool,
    interview: &Interview,
    candidate: &User,
    cover_letter: Option<String>,
) -> Result<InterviewApplication, AppError> {
    check_application(interview, candidate)?;

    let result = sqlx::query_as::<_, InterviewApplication>(
        r#"
        INSERT INTO interview_applications (id, interview_id, candidate_id, status, cover_letter)
        VALUES ($1, $2, $3, 'applied', $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interview.id)
    .bind(candidate.id)
    .bind(cover_letter.filter(|c| !c.trim().is_empty()))
    .fetch_one(pool)
    .await;

    match result {
        Ok(application) => Ok(application),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
            "You have already applied to this interview".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Applications are reviewed once.
pub fn review_transition(
    current: ApplicationStatus,
    decision: ReviewDecision,
) -> Result<ApplicationStatus, AppError> {
    if current != ApplicationStatus::Applied {
        return Err(AppError::Conflict("Application has already been reviewed".into()));
    }
    Ok(match decision {
        ReviewDecision::Approve => ApplicationStatus::Approved,
        ReviewDecision::Reject => ApplicationStatus::Rejected,
    })
}

pub async fn load_application(
    pool: &PgPool,
    id: Uuid,
) -> Result<InterviewApplication, AppError> {
    let application: Option<InterviewApplication> =
        sqlx::query_as("SELECT * FROM interview_applications WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    application.ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

pub async fn review_application(
    pool: &PgPool,
    application: &InterviewApplication,
    reviewer_id: Uuid,
    decision: ReviewDecision,
    notes: Option<String>,
) -> Result<InterviewApplication, AppError> {
    let status = review_transition(application.status, decision)?;
    let updated: Option<InterviewApplication> = sqlx::query_as(
        r#"
        UPDATE interview_applications
           SET status = $2, reviewer_id = $3, notes = COALESCE($4, notes), reviewed_at = now()
         WHERE id = $1 AND status = 'applied'
        RETURNING *
        "#,
    )
    .bind(application.id)
    .bind(status)
    .bind(reviewer_id)
    .bind(notes)
    .fetch_optional(pool)
    .await?;
    updated.ok_or_else(|| AppError::Conflict("Application has already been reviewed".into()))
}

/// An application with the applicant's contact details, for reviewers.
#[derive(Debug, Serialize, FromRow)]
pub struct ApplicationSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: InterviewApplication,
    pub candidate_email: String,
    pub candidate_first_name: Option<String>,
    pub candidate_last_name: Option<String>,
}

pub async fn list_applications(
    pool: &PgPool,
    interview_id: Uuid,
) -> Result<Vec<ApplicationSummary>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT a.*,
               u.email AS candidate_email,
               u.first_name AS candidate_first_name,
               u.last_name AS candidate_last_name
        FROM interview_applications a
        JOIN users u ON u.id = a.candidate_id
        WHERE a.interview_id = $1
        ORDER BY a.applied_at
        "#,
    )
    .bind(interview_id)
    .fetch_all(pool)
    .await
}
