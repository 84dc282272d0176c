use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interview_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    /// Candidates apply, or reach it through the cross-org/public-invitation flags.
    Public,
    /// Invite-only.
    Private,
    /// Calendar-booked.
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "schedule_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// A single question stored in `interviews.questions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub text: String,
    #[serde(rename = "type", default = "default_question_type")]
    pub question_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

fn default_question_type() -> String {
    "text".to_string()
}

/// One answered question stored in `interview_responses.answers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub title: String,
    pub job_description: String,
    pub questions: Json<Vec<InterviewQuestion>>,
    pub duration_minutes: i32,
    pub recruiter_id: Uuid,
    pub organization_id: Uuid,
    pub interview_type: InterviewType,
    pub cross_org_accessible: bool,
    pub public_invitation_enabled: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewApplication {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub candidate_id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
    pub reviewer_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewInvitation {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub candidate_id: Uuid,
    pub recruiter_id: Uuid,
    pub organization_id: Uuid,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub is_cross_organization: bool,
    pub invited_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl InvitationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, InvitationStatus::Pending)
    }
}

impl InterviewInvitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Expired || now > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewSchedule {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub candidate_id: Uuid,
    pub recruiter_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: ScheduleStatus,
    pub meeting_link: Option<String>,
    pub time_zone: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub candidate_id: Uuid,
    pub answers: Json<Vec<AnswerRecord>>,
    pub ai_score: Option<f64>,
    pub ai_feedback: Option<String>,
    pub time_taken_minutes: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_question_type_defaults_to_text() {
        let q: InterviewQuestion =
            serde_json::from_str(r#"{"text":"Why us?","category":"motivation"}"#).unwrap();
        assert_eq!(q.question_type, "text");
        assert!(q.expected_keywords.is_empty());
    }

    #[test]
    fn test_invitation_expiry_uses_deadline() {
        let now = Utc::now();
        let invitation = InterviewInvitation {
            id: Uuid::new_v4(),
            interview_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            recruiter_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            status: InvitationStatus::Pending,
            message: None,
            is_cross_organization: true,
            invited_at: now - Duration::days(8),
            expires_at: now - Duration::days(1),
            responded_at: None,
        };
        assert!(invitation.is_expired(now));
        assert!(!invitation.is_expired(now - Duration::days(2)));
    }
}
