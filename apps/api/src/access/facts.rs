use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::policy::CandidateInterviewFacts;
use crate::models::interview::{ApplicationStatus, InvitationStatus, ScheduleStatus};

#[derive(Debug, FromRow)]
struct FactsRow {
    application_status: Option<ApplicationStatus>,
    invitation_status: Option<InvitationStatus>,
    schedule_status: Option<ScheduleStatus>,
    has_response: bool,
}

/// Loads a candidate's application, invitation, booking and response state for one
/// interview in a single round trip. A live `scheduled` booking wins over older rows.
pub async fn load_candidate_interview_facts(
    pool: &PgPool,
    interview_id: Uuid,
    candidate_id: Uuid,
) -> Result<CandidateInterviewFacts, sqlx::Error> {
    let row: FactsRow = sqlx::query_as(
        r#"
        SELECT
            (SELECT status FROM interview_applications
              WHERE interview_id = $1 AND candidate_id = $2) AS application_status,
            (SELECT status FROM interview_invitations
              WHERE interview_id = $1 AND candidate_id = $2) AS invitation_status,
            (SELECT status FROM interview_schedules
              WHERE interview_id = $1 AND candidate_id = $2
              ORDER BY (status = 'scheduled') DESC, scheduled_at DESC
              LIMIT 1) AS schedule_status,
            EXISTS (SELECT 1 FROM interview_responses
              WHERE interview_id = $1 AND candidate_id = $2) AS has_response
        "#,
    )
    .bind(interview_id)
    .bind(candidate_id)
    .fetch_one(pool)
    .await?;

    Ok(CandidateInterviewFacts {
        application_status: row.application_status,
        invitation_status: row.invitation_status,
        schedule_status: row.schedule_status,
        has_response: row.has_response,
    })
}
