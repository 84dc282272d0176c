use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::access::policy::{CandidateInterviewFacts, InterviewAccess};
use crate::access::{authorize, load_candidate_interview_facts, Action, Resource};
use crate::ai::questions::{QuestionSet, DEFAULT_QUESTIONS};
use crate::ai::AiOutcome;
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::interviews::invitations::{
    self, create_invitation, respond_to_invitation, CandidateInvitation, InvitationKind,
    InvitationReply,
};
use crate::interviews::responses::{list_responses, submit_response, ResponseSummary, SubmitRequest};
use crate::interviews::scheduling::{
    schedule_bulk, schedule_interview, BulkScheduleResult, ScheduleRequest, ScheduledSlot,
};
use crate::interviews::service::{
    apply, create_interview, list_applications, list_for_candidate, list_for_staff,
    load_application, load_interview, regenerate_questions, review_application,
    ApplicationSummary, CandidateInterview, CreatedInterview, NewInterviewRequest,
    ReviewDecision,
};
use crate::models::interview::{
    ApplicationStatus, Interview, InterviewApplication, InterviewInvitation,
};
use crate::models::user::{User, UserRole};
use crate::notifications::{deliver, templates, DeliveryReport, Recipient};
use crate::response::ApiResponse;
use crate::state::AppState;

fn managed(interview: &Interview) -> Resource<'static> {
    Resource::Interview {
        interview: InterviewAccess::from(interview),
        candidate: None,
    }
}

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

fn require_candidate(auth: &AuthUser) -> Result<(), AppError> {
    if auth.role == UserRole::Candidate {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only candidates can do this".into()))
    }
}

/// POST /api/v1/interviews
///
/// Questions are generated from the title and job description unless supplied.
pub async fn handle_create_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<NewInterviewRequest>,
) -> Result<Response, AppError> {
    authorize(
        &auth.actor(),
        Resource::NewInterview {
            organization_id: auth.organization_id,
        },
        Action::Create,
    )
    .require()?;
    let organization_id = auth
        .organization_id
        .ok_or_else(|| AppError::Validation("Your account has no organization".into()))?;

    let created: CreatedInterview =
        create_interview(&state.db, state.ai.as_ref(), auth.user_id, organization_id, req).await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_created", "interview")
            .by(auth.user_id, auth.organization_id)
            .resource(created.interview.id)
            .details(json!({
                "title": created.interview.title,
                "interview_type": created.interview.interview_type,
            })),
    )
    .await;
    Ok(ApiResponse::created(created))
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum InterviewList {
    Managed(Vec<Interview>),
    Candidate(Vec<CandidateInterview>),
}

#[derive(Serialize)]
pub struct InterviewListResponse {
    pub interviews: InterviewList,
    pub count: usize,
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<InterviewListResponse>>, AppError> {
    let user = auth.load(&state.db).await?;
    let (interviews, count) = match user.role {
        UserRole::Candidate => {
            let list = list_for_candidate(&state.db, &user).await?;
            let count = list.len();
            (InterviewList::Candidate(list), count)
        }
        UserRole::SuperAdmin => {
            let list = list_for_staff(&state.db, None).await?;
            let count = list.len();
            (InterviewList::Managed(list), count)
        }
        _ => {
            let organization_id = user
                .organization_id
                .ok_or_else(|| AppError::Validation("Your account has no organization".into()))?;
            let list = list_for_staff(&state.db, Some(organization_id)).await?;
            let count = list.len();
            (InterviewList::Managed(list), count)
        }
    };
    Ok(ApiResponse::ok(InterviewListResponse { interviews, count }))
}

#[derive(Serialize)]
pub struct InterviewDetailResponse {
    pub interview: Interview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InterviewDetailResponse>>, AppError> {
    let interview = load_interview(&state.db, id).await?;
    let facts: Option<CandidateInterviewFacts> = if auth.role == UserRole::Candidate {
        Some(load_candidate_interview_facts(&state.db, id, auth.user_id).await?)
    } else {
        None
    };
    authorize(
        &auth.actor(),
        Resource::Interview {
            interview: InterviewAccess::from(&interview),
            candidate: facts.as_ref(),
        },
        Action::View,
    )
    .require()?;

    Ok(ApiResponse::ok(InterviewDetailResponse {
        interview,
        completed: facts.map(|f| f.has_response),
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateQuestionsRequest {
    #[serde(default)]
    pub num_questions: Option<usize>,
}

/// POST /api/v1/interviews/:id/questions/generate
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<Json<ApiResponse<AiOutcome<QuestionSet>>>, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;

    let outcome = regenerate_questions(
        &state.db,
        state.ai.as_ref(),
        &interview,
        req.num_questions.unwrap_or(DEFAULT_QUESTIONS),
    )
    .await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_questions_generated", "interview")
            .by(auth.user_id, auth.organization_id)
            .resource(interview.id)
            .details(json!({
                "count": outcome.value.questions.len(),
                "generated_by_ai": outcome.generated_by_ai,
            })),
    )
    .await;
    Ok(ApiResponse::ok(outcome))
}

#[derive(Debug, Deserialize, Default)]
pub struct ApplyRequest {
    #[serde(default)]
    pub cover_letter: Option<String>,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub application: InterviewApplication,
}

/// POST /api/v1/interviews/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<Response, AppError> {
    require_candidate(&auth)?;
    let candidate = auth.load(&state.db).await?;
    let interview = load_interview(&state.db, id).await?;

    let application = apply(&state.db, &interview, &candidate, req.cover_letter).await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_applied", "interview_application")
            .by(candidate.id, candidate.organization_id)
            .resource(application.id)
            .details(json!({ "interview_id": interview.id })),
    )
    .await;
    Ok(ApiResponse::created(ApplicationResponse { application }))
}

#[derive(Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationSummary>,
}

/// GET /api/v1/interviews/:id/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationListResponse>>, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;
    let applications = list_applications(&state.db, interview.id).await?;
    Ok(ApiResponse::ok(ApplicationListResponse { applications }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub application: InterviewApplication,
    pub notification: DeliveryReport,
}

/// POST /api/v1/applications/:id/review
pub async fn handle_review_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, AppError> {
    let application = load_application(&state.db, id).await?;
    let interview = load_interview(&state.db, application.interview_id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;

    let application =
        review_application(&state.db, &application, auth.user_id, req.decision, req.notes)
            .await?;
    let approved = application.status == ApplicationStatus::Approved;

    let candidate = load_user(&state, application.candidate_id).await?;
    let notification = deliver(
        state.notifier.as_ref(),
        Recipient {
            email: &candidate.email,
            phone: None,
        },
        &templates::application_reviewed(&candidate.full_name(), &interview.title, approved),
    )
    .await;

    audit::record(
        &state.db,
        AuditEntry::new("application_reviewed", "interview_application")
            .by(auth.user_id, auth.organization_id)
            .resource(application.id)
            .details(json!({
                "interview_id": interview.id,
                "status": application.status,
            })),
    )
    .await;
    Ok(ApiResponse::ok(ReviewResponse {
        application,
        notification,
    }))
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub candidate_id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct InvitationResponse {
    pub invitation: InterviewInvitation,
    pub kind: InvitationKind,
    pub notification: DeliveryReport,
}

/// POST /api/v1/interviews/:id/invitations
pub async fn handle_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> Result<Response, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;
    let candidate = load_user(&state, req.candidate_id).await?;

    let (invitation, kind) =
        create_invitation(&state.db, &interview, &candidate, auth.user_id, req.message).await?;

    let organization_name: String =
        sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
            .bind(interview.organization_id)
            .fetch_optional(&state.db)
            .await?
            .unwrap_or_else(|| "TalentIQ".to_string());
    let link = format!("{}/invitations", state.config.base_url.trim_end_matches('/'));
    let notification = deliver(
        state.notifier.as_ref(),
        Recipient {
            email: &candidate.email,
            phone: None,
        },
        &templates::interview_invitation(
            &candidate.full_name(),
            &interview.title,
            &organization_name,
            invitation.message.as_deref(),
            invitation.expires_at,
            &link,
        ),
    )
    .await;

    audit::record(
        &state.db,
        AuditEntry::new("interview_invitation_sent", "interview_invitation")
            .by(auth.user_id, auth.organization_id)
            .resource(invitation.id)
            .details(json!({
                "interview_id": interview.id,
                "candidate_id": candidate.id,
                "cross_organization": invitation.is_cross_organization,
            })),
    )
    .await;
    Ok(ApiResponse::created(InvitationResponse {
        invitation,
        kind,
        notification,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub response: InvitationReply,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub invitation: InterviewInvitation,
}

/// POST /api/v1/invitations/:id/respond
pub async fn handle_respond_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<ApiResponse<RespondResponse>>, AppError> {
    require_candidate(&auth)?;
    let invitation = respond_to_invitation(&state.db, id, auth.user_id, req.response).await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_invitation_answered", "interview_invitation")
            .by(auth.user_id, auth.organization_id)
            .resource(invitation.id)
            .details(json!({ "status": invitation.status })),
    )
    .await;
    Ok(ApiResponse::ok(RespondResponse { invitation }))
}

#[derive(Serialize)]
pub struct MyInvitationsResponse {
    pub invitations: Vec<CandidateInvitation>,
    pub pending: usize,
}

/// GET /api/v1/invitations/mine
pub async fn handle_my_invitations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MyInvitationsResponse>>, AppError> {
    require_candidate(&auth)?;
    let invitations = invitations::list_for_candidate(&state.db, auth.user_id).await?;
    let pending = invitations
        .iter()
        .filter(|i| i.invitation.status.is_pending())
        .count();
    Ok(ApiResponse::ok(MyInvitationsResponse {
        invitations,
        pending,
    }))
}

/// POST /api/v1/interviews/:id/schedules
pub async fn handle_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Response, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;

    let slot: ScheduledSlot =
        schedule_interview(&state.db, state.notifier.as_ref(), &interview, auth.user_id, &req)
            .await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_scheduled", "interview_schedule")
            .by(auth.user_id, auth.organization_id)
            .resource(slot.schedule.id)
            .details(json!({
                "interview_id": interview.id,
                "candidate_id": slot.schedule.candidate_id,
                "scheduled_at": slot.schedule.scheduled_at,
            })),
    )
    .await;
    Ok(ApiResponse::created(slot))
}

#[derive(Debug, Deserialize)]
pub struct BulkScheduleRequest {
    pub schedules: Vec<ScheduleRequest>,
}

/// POST /api/v1/interviews/:id/schedules/bulk
///
/// Books every entry it can; failures are listed next to the successes.
pub async fn handle_schedule_bulk(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<BulkScheduleRequest>,
) -> Result<Json<ApiResponse<BulkScheduleResult>>, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;

    let result = schedule_bulk(
        &state.db,
        state.notifier.as_ref(),
        &interview,
        auth.user_id,
        &req.schedules,
    )
    .await?;
    if !result.failed.is_empty() {
        warn!(
            interview_id = %interview.id,
            failed = result.failed.len(),
            scheduled = result.scheduled.len(),
            "Bulk scheduling finished with failures"
        );
    }
    audit::record(
        &state.db,
        AuditEntry::new("interviews_bulk_scheduled", "interview")
            .by(auth.user_id, auth.organization_id)
            .resource(interview.id)
            .details(json!({
                "scheduled": result.scheduled.len(),
                "failed": result.failed.len(),
            })),
    )
    .await;
    Ok(ApiResponse::ok(result))
}

/// POST /api/v1/interviews/:id/responses
pub async fn handle_submit_response(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    require_candidate(&auth)?;
    let candidate = auth.load(&state.db).await?;
    let interview = load_interview(&state.db, id).await?;
    let facts = load_candidate_interview_facts(&state.db, interview.id, candidate.id).await?;

    let submitted = submit_response(
        &state.db,
        state.ai.as_ref(),
        &interview,
        candidate.id,
        &facts,
        req,
    )
    .await?;
    audit::record(
        &state.db,
        AuditEntry::new("interview_completed", "interview_response")
            .by(candidate.id, candidate.organization_id)
            .resource(submitted.response.id)
            .details(json!({
                "interview_id": interview.id,
                "ai_score": submitted.response.ai_score,
                "generated_by_ai": submitted.scoring.generated_by_ai,
            })),
    )
    .await;
    Ok(ApiResponse::created(submitted))
}

#[derive(Serialize)]
pub struct ResponseListResponse {
    pub responses: Vec<ResponseSummary>,
    pub count: usize,
}

/// GET /api/v1/interviews/:id/responses
pub async fn handle_list_responses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResponseListResponse>>, AppError> {
    let interview = load_interview(&state.db, id).await?;
    authorize(&auth.actor(), managed(&interview), Action::Manage).require()?;
    let responses = list_responses(&state.db, interview.id).await?;
    Ok(ApiResponse::ok(ResponseListResponse {
        count: responses.len(),
        responses,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json as SqlJson;

    use super::*;
    use crate::access::Actor;
    use crate::models::interview::InterviewType;

    fn interview(org: Uuid) -> Interview {
        Interview {
            id: Uuid::new_v4(),
            title: "Backend".into(),
            job_description: "APIs".into(),
            questions: SqlJson(vec![]),
            duration_minutes: 30,
            recruiter_id: Uuid::new_v4(),
            organization_id: org,
            interview_type: InterviewType::Private,
            cross_org_accessible: false,
            public_invitation_enabled: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn actor(role: UserRole, org: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            organization_id: org,
        }
    }

    #[test]
    fn test_only_owning_org_manages() {
        let org = Uuid::new_v4();
        let iv = interview(org);
        let own = actor(UserRole::Recruiter, Some(org));
        let other = actor(UserRole::Admin, Some(Uuid::new_v4()));
        let root = actor(UserRole::SuperAdmin, None);
        let candidate = actor(UserRole::Candidate, Some(org));

        assert!(authorize(&own, managed(&iv), Action::Manage).allowed);
        assert!(!authorize(&other, managed(&iv), Action::Manage).allowed);
        assert!(authorize(&root, managed(&iv), Action::Manage).allowed);
        assert!(!authorize(&candidate, managed(&iv), Action::Manage).allowed);
    }

    #[test]
    fn test_request_bodies() {
        let review: ReviewRequest =
            serde_json::from_str(r#"{"decision":"approve","notes":"Strong"}"#).unwrap();
        assert_eq!(review.decision, ReviewDecision::Approve);
        assert!(serde_json::from_str::<ReviewRequest>(r#"{"decision":"maybe"}"#).is_err());

        let respond: RespondRequest = serde_json::from_str(r#"{"response":"decline"}"#).unwrap();
        assert_eq!(respond.response, InvitationReply::Decline);

        let generate: GenerateQuestionsRequest = serde_json::from_str("{}").unwrap();
        assert!(generate.num_questions.is_none());
    }

    #[test]
    fn test_interview_list_serializes_as_plain_array() {
        let body = InterviewListResponse {
            interviews: InterviewList::Managed(vec![interview(Uuid::new_v4())]),
            count: 1,
        };
        let value = serde_json::to_value(body).unwrap();
        assert!(value["interviews"].is_array());
        assert_eq!(value["interviews"][0]["title"], "Backend");
    }
}
