use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "technical_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TechnicalDecision {
    Selected,
    Rejected,
    SecondRound,
}

impl TechnicalDecision {
    pub fn requires_second_round(&self) -> bool {
        matches!(self, TechnicalDecision::SecondRound)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TechnicalInterviewAssignment {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub technical_person_id: Uuid,
    pub candidate_id: Uuid,
    pub organization_id: Uuid,
    pub assigned_by: Uuid,
    pub interview_date: Option<DateTime<Utc>>,
    pub meeting_link: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TechnicalInterviewFeedback {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub decision: TechnicalDecision,
    pub technical_comments: Option<String>,
    pub communication_comments: Option<String>,
    pub overall_comments: Option<String>,
    pub technical_skills_rating: Option<i16>,
    pub problem_solving_rating: Option<i16>,
    pub communication_rating: Option<i16>,
    pub cultural_fit_rating: Option<i16>,
    pub requires_second_round: bool,
    pub submitted_at: DateTime<Utc>,
}
