use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::access::policy::InterviewAccess;
use crate::access::{authorize, Action, Resource};
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::interviews::service::load_interview;
use crate::models::technical::{TechnicalInterviewAssignment, TechnicalInterviewFeedback};
use crate::models::user::{User, UserRole};
use crate::notifications::{deliver, templates, DeliveryReport, Recipient};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::technical::service::{
    assign_technical_interview, dashboard, load_assignment, load_feedback,
    organization_reviewers, pending_second_rounds, submit_feedback, AssignRequest,
    AssignmentOutcome, FeedbackRequest, SecondRoundRequest, TechnicalDashboard,
};

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

#[derive(Serialize)]
pub struct AssignResponse {
    #[serde(flatten)]
    pub outcome: AssignmentOutcome,
    pub notification: DeliveryReport,
}

/// POST /api/v1/technical/assignments
///
/// Assigning the same interviewer to the same candidate again returns the existing
/// assignment with 200 and sends nothing.
pub async fn handle_assign(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AssignRequest>,
) -> Result<Response, AppError> {
    let interview = load_interview(&state.db, req.interview_id).await?;
    authorize(
        &auth.actor(),
        Resource::Interview {
            interview: InterviewAccess::from(&interview),
            candidate: None,
        },
        Action::Manage,
    )
    .require()?;

    let technical_person = load_user(&state, req.technical_person_id).await?;
    let candidate = load_user(&state, req.candidate_id).await?;
    let outcome = assign_technical_interview(
        &state.db,
        &interview,
        &technical_person,
        &candidate,
        auth.user_id,
        &req,
    )
    .await?;

    if !outcome.created {
        return Ok(ApiResponse::ok(AssignResponse {
            outcome,
            notification: DeliveryReport::default(),
        })
        .into_response());
    }

    let notification = deliver(
        state.notifier.as_ref(),
        Recipient {
            email: &technical_person.email,
            phone: technical_person.phone.as_deref(),
        },
        &templates::technical_assignment(
            &technical_person.full_name(),
            &candidate.full_name(),
            &interview.title,
            outcome.assignment.interview_date,
        ),
    )
    .await;

    audit::record(
        &state.db,
        AuditEntry::new("technical_interview_assigned", "technical_interview_assignment")
            .by(auth.user_id, auth.organization_id)
            .resource(outcome.assignment.id)
            .details(json!({
                "interview_id": interview.id,
                "technical_person_id": technical_person.id,
                "candidate_id": candidate.id,
            })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(AssignResponse {
            outcome,
            notification,
        }),
    )
        .into_response())
}

/// GET /api/v1/technical/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<TechnicalDashboard>>, AppError> {
    if auth.role != UserRole::TechnicalPerson {
        return Err(AppError::Forbidden(
            "The technical dashboard is for technical interviewers".into(),
        ));
    }
    auth.load(&state.db).await?;
    let data = dashboard(&state.db, auth.user_id).await?;
    Ok(ApiResponse::ok(data))
}

#[derive(Serialize)]
pub struct AssignmentDetailResponse {
    pub assignment: TechnicalInterviewAssignment,
    pub feedback: Option<TechnicalInterviewFeedback>,
}

/// GET /api/v1/technical/assignments/:id
pub async fn handle_get_assignment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AssignmentDetailResponse>>, AppError> {
    let assignment = load_assignment(&state.db, id).await?;
    authorize(
        &auth.actor(),
        Resource::TechnicalAssignment(&assignment),
        Action::View,
    )
    .require()?;
    let feedback = load_feedback(&state.db, assignment.id).await?;
    Ok(ApiResponse::ok(AssignmentDetailResponse {
        assignment,
        feedback,
    }))
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub feedback: TechnicalInterviewFeedback,
    pub reviewers_notified: usize,
}

/// POST /api/v1/technical/assignments/:id/feedback
///
/// Resubmitting replaces the earlier feedback.
pub async fn handle_submit_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackResponse>>, AppError> {
    let assignment = load_assignment(&state.db, id).await?;
    authorize(
        &auth.actor(),
        Resource::TechnicalAssignment(&assignment),
        Action::SubmitFeedback,
    )
    .require()?;

    let feedback = submit_feedback(&state.db, &assignment, &req).await?;

    let interviewer = load_user(&state, assignment.technical_person_id).await?;
    let candidate = load_user(&state, assignment.candidate_id).await?;
    let interview = load_interview(&state.db, assignment.interview_id).await?;
    let decision = serde_json::to_value(feedback.decision)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let mut reviewers_notified = 0;
    for reviewer in organization_reviewers(&state.db, assignment.organization_id).await? {
        let report = deliver(
            state.notifier.as_ref(),
            Recipient {
                email: &reviewer.email,
                phone: None,
            },
            &templates::technical_feedback_received(
                &reviewer.full_name(),
                &candidate.full_name(),
                &interviewer.full_name(),
                &interview.title,
                &decision,
            ),
        )
        .await;
        if report.email_sent {
            reviewers_notified += 1;
        }
    }

    audit::record(
        &state.db,
        AuditEntry::new("technical_feedback_submitted", "technical_interview_feedback")
            .by(auth.user_id, auth.organization_id)
            .resource(feedback.id)
            .details(json!({
                "assignment_id": assignment.id,
                "decision": feedback.decision,
                "requires_second_round": feedback.requires_second_round,
            })),
    )
    .await;

    Ok(ApiResponse::ok(FeedbackResponse {
        feedback,
        reviewers_notified,
    }))
}

#[derive(Serialize)]
pub struct SecondRoundsResponse {
    pub second_rounds: Vec<SecondRoundRequest>,
}

/// GET /api/v1/technical/second-rounds
pub async fn handle_second_rounds(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<SecondRoundsResponse>>, AppError> {
    authorize(
        &auth.actor(),
        Resource::Organization(auth.organization_id),
        Action::View,
    )
    .require()?;
    let organization_id = auth
        .organization_id
        .ok_or_else(|| AppError::Validation("Your account has no organization".into()))?;
    let second_rounds = pending_second_rounds(&state.db, organization_id).await?;
    Ok(ApiResponse::ok(SecondRoundsResponse { second_rounds }))
}
