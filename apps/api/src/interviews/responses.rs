//! Answer submission and scoring.
//!
//! A candidate answers an interview once. The handler checks access and the existing
//! response before scoring; the unique index on (interview, candidate) settles races
//! between concurrent submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::policy::{interview_visibility, CandidateInterviewFacts, InterviewAccess};
use crate::ai::scoring::{score_interview_responses, ScoreResult};
use crate::ai::AiOutcome;
use crate::errors::{is_unique_violation, AppError};
use crate::interviews::scheduling::mark_completed;
use crate::llm_client::ChatCompletion;
use crate::models::interview::{AnswerRecord, Interview, InterviewResponse};

const MAX_ANSWER_CHARS: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub time_taken_minutes: Option<i32>,
}

impl SubmitRequest {
    pub fn validate(&self, interview: &Interview) -> Result<(), AppError> {
        if self.answers.is_empty() {
            return Err(AppError::Validation("At least one answer is required".into()));
        }
        let asked = interview.questions.0.len();
        if asked > 0 && self.answers.len() > asked {
            return Err(AppError::Validation(format!(
                "Interview has {asked} questions but {} answers were sent",
                self.answers.len()
            )));
        }
        if self
            .answers
            .iter()
            .any(|a| a.answer.chars().count() > MAX_ANSWER_CHARS)
        {
            return Err(AppError::Validation(format!(
                "Answers must be at most {MAX_ANSWER_CHARS} characters"
            )));
        }
        if matches!(self.time_taken_minutes, Some(m) if m < 0) {
            return Err(AppError::Validation("time_taken_minutes must not be negative".into()));
        }
        Ok(())
    }
}

/// Re-checks that the candidate may still submit. An existing response wins over every
/// other reason so a repeated submit always reads "already completed".
pub fn check_submission(
    interview: &Interview,
    facts: &CandidateInterviewFacts,
) -> Result<(), AppError> {
    if facts.has_response {
        return Err(AppError::AlreadyCompleted);
    }
    interview_visibility(&InterviewAccess::from(interview), facts).require()
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub response: InterviewResponse,
    pub scoring: AiOutcome<ScoreResult>,
}

pub async fn submit_response(
    pool: &PgPool,
    client: &dyn ChatCompletion,
    interview: &Interview,
    candidate_id: Uuid,
    facts: &CandidateInterviewFacts,
    req: SubmitRequest,
) -> Result<SubmittedResponse, AppError> {
    check_submission(interview, facts)?;
    req.validate(interview)?;

    let scoring =
        score_interview_responses(client, &req.answers, &interview.job_description).await;

    let inserted = sqlx::query_as::<_, InterviewResponse>(
        r#"
        INSERT INTO interview_responses
            (id, interview_id, candidate_id, answers, ai_score, ai_feedback, time_taken_minutes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interview.id)
    .bind(candidate_id)
    .bind(Json(&req.answers))
    .bind(scoring.value.score)
    .bind(&scoring.value.feedback)
    .bind(req.time_taken_minutes)
    .fetch_one(pool)
    .await;

    let response = match inserted {
        Ok(response) => response,
        Err(e) if is_unique_violation(&e) => return Err(AppError::AlreadyCompleted),
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = mark_completed(pool, interview.id, candidate_id).await {
        warn!(interview_id = %interview.id, "Could not close schedule after submit: {e}");
    }

    info!(
        interview_id = %interview.id,
        candidate_id = %candidate_id,
        score = ?response.ai_score,
        generated_by_ai = scoring.generated_by_ai,
        "Interview response recorded"
    );
    Ok(SubmittedResponse { response, scoring })
}

/// A stored response with the candidate's contact details, for recruiters.
#[derive(Debug, Serialize, FromRow)]
pub struct ResponseSummary {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_email: String,
    pub candidate_first_name: Option<String>,
    pub candidate_last_name: Option<String>,
    pub answers: Json<Vec<AnswerRecord>>,
    pub ai_score: Option<f64>,
    pub ai_feedback: Option<String>,
    pub time_taken_minutes: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

pub async fn list_responses(
    pool: &PgPool,
    interview_id: Uuid,
) -> Result<Vec<ResponseSummary>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT r.id, r.candidate_id,
               u.email AS candidate_email,
               u.first_name AS candidate_first_name,
               u.last_name AS candidate_last_name,
               r.answers, r.ai_score, r.ai_feedback, r.time_taken_minutes, r.completed_at
        FROM interview_responses r
        JOIN users u ON u.id = r.candidate_id
        WHERE r.interview_id = $1
        ORDER BY r.ai_score DESC NULLS LAST, r.completed_at
        "#,
    )
    .bind(interview_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::{
        ApplicationStatus, InterviewQuestion, InterviewType, InvitationStatus, ScheduleStatus,
    };

    fn question(text: &str) -> InterviewQuestion {
        InterviewQuestion {
            text: text.into(),
            question_type: "text".into(),
            category: "general".into(),
            expected_keywords: vec![],
        }
    }

    fn interview(kind: InterviewType) -> Interview {
        Interview {
            id: Uuid::new_v4(),
            title: "Backend".into(),
            job_description: "APIs".into(),
            questions: Json(vec![question("Q1"), question("Q2")]),
            duration_minutes: 30,
            recruiter_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            interview_type: kind,
            cross_org_accessible: false,
            public_invitation_enabled: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn answers(n: usize) -> Vec<AnswerRecord> {
        (0..n)
            .map(|i| AnswerRecord {
                question: format!("Q{i}"),
                answer: "Because it matters.".into(),
            })
            .collect()
    }

    #[test]
    fn test_existing_response_reads_already_completed() {
        let scheduled = interview(InterviewType::Scheduled);
        // The booking is already completed, which alone would deny access.
        let facts = CandidateInterviewFacts {
            schedule_status: Some(ScheduleStatus::Completed),
            has_response: true,
            ..Default::default()
        };
        assert!(matches!(
            check_submission(&scheduled, &facts),
            Err(AppError::AlreadyCompleted)
        ));
    }

    #[test]
    fn test_submission_requires_access() {
        let private = interview(InterviewType::Private);
        let pending = CandidateInterviewFacts {
            invitation_status: Some(InvitationStatus::Pending),
            ..Default::default()
        };
        assert!(matches!(
            check_submission(&private, &pending),
            Err(AppError::Forbidden(_))
        ));

        let accepted = CandidateInterviewFacts {
            invitation_status: Some(InvitationStatus::Accepted),
            ..Default::default()
        };
        assert!(check_submission(&private, &accepted).is_ok());

        let public = interview(InterviewType::Public);
        let approved = CandidateInterviewFacts {
            application_status: Some(ApplicationStatus::Approved),
            ..Default::default()
        };
        assert!(check_submission(&public, &approved).is_ok());
    }

    #[test]
    fn test_request_validation() {
        let iv = interview(InterviewType::Public);
        let ok = SubmitRequest {
            answers: answers(2),
            time_taken_minutes: Some(12),
        };
        assert!(ok.validate(&iv).is_ok());

        let none = SubmitRequest {
            answers: vec![],
            time_taken_minutes: None,
        };
        assert!(matches!(none.validate(&iv), Err(AppError::Validation(_))));

        let too_many = SubmitRequest {
            answers: answers(3),
            time_taken_minutes: None,
        };
        assert!(matches!(too_many.validate(&iv), Err(AppError::Validation(_))));

        let negative = SubmitRequest {
            answers: answers(1),
            time_taken_minutes: Some(-4),
        };
        assert!(matches!(negative.validate(&iv), Err(AppError::Validation(_))));
    }
}
