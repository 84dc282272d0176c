//! Technical interviews: assigning an interviewer to a candidate and collecting their
//! structured feedback.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::Interview;
use crate::models::technical::{
    AssignmentStatus, TechnicalDecision, TechnicalInterviewAssignment, TechnicalInterviewFeedback,
};
use crate::models::user::{User, UserRole};

pub const RECENT_COMPLETED_LIMIT: i64 = 10;
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
const MAX_COMMENT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub interview_id: Uuid,
    pub technical_person_id: Uuid,
    pub candidate_id: Uuid,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

/// The interviewer must be an active technical person of the interview's organization
/// and the interviewee an active candidate.
pub fn check_assignment(
    interview: &Interview,
    technical_person: &User,
    candidate: &User,
) -> Result<(), AppError> {
    if technical_person.role != UserRole::TechnicalPerson || !technical_person.user_active {
        return Err(AppError::Validation(format!(
            "User {} is not an active technical person",
            technical_person.id
        )));
    }
    if technical_person.organization_id != Some(interview.organization_id) {
        return Err(AppError::Validation(
            "Technical person belongs to another organization".into(),
        ));
    }
    if candidate.role != UserRole::Candidate || !candidate.user_active {
        return Err(AppError::Validation(format!(
            "User {} is not an active candidate",
            candidate.id
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AssignmentOutcome {
    pub assignment: TechnicalInterviewAssignment,
    /// False when the same assignment already existed and was returned as is.
    pub created: bool,
}

pub async fn assign_technical_interview(
    pool: &PgPool,
    interview: &Interview,
    technical_person: &User,
    candidate: &User,
    assigned_by: Uuid,
    req: &AssignRequest,
) -> Result<AssignmentOutcome, AppError> {
    check_assignment(interview, technical_person, candidate)?;

    let inserted: Option<TechnicalInterviewAssignment> = sqlx::query_as(
        r#"
        INSERT INTO technical_interview_assignments
            (id, interview_id, technical_person_id, candidate_id, organization_id, assigned_by,
             interview_date, meeting_link, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
        ON CONFLICT (interview_id, technical_person_id, candidate_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interview.id)
    .bind(technical_person.id)
    .bind(candidate.id)
    .bind(interview.organization_id)
    .bind(assigned_by)
    .bind(req.interview_date)
    .bind(req.meeting_link.as_deref())
    .fetch_optional(pool)
    .await?;

    if let Some(assignment) = inserted {
        info!(
            assignment_id = %assignment.id,
            interview_id = %interview.id,
            technical_person_id = %technical_person.id,
            "Technical interview assigned"
        );
        return Ok(AssignmentOutcome {
            assignment,
            created: true,
        });
    }

    let existing: TechnicalInterviewAssignment = sqlx::query_as(
        r#"
        SELECT * FROM technical_interview_assignments
        WHERE interview_id = $1 AND technical_person_id = $2 AND candidate_id = $3
        "#,
    )
    .bind(interview.id)
    .bind(technical_person.id)
    .bind(candidate.id)
    .fetch_one(pool)
    .await?;
    Ok(AssignmentOutcome {
        assignment: existing,
        created: false,
    })
}

pub async fn load_assignment(
    pool: &PgPool,
    id: Uuid,
) -> Result<TechnicalInterviewAssignment, AppError> {
    let assignment: Option<TechnicalInterviewAssignment> =
        sqlx::query_as("SELECT * FROM technical_interview_assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    assignment.ok_or_else(|| AppError::NotFound(format!("Assignment {id} not found")))
}

pub async fn load_feedback(
    pool: &PgPool,
    assignment_id: Uuid,
) -> Result<Option<TechnicalInterviewFeedback>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM technical_interview_feedback WHERE assignment_id = $1")
        .bind(assignment_id)
        .fetch_optional(pool)
        .await
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub decision: TechnicalDecision,
    #[serde(default)]
    pub technical_comments: Option<String>,
    #[serde(default)]
    pub communication_comments: Option<String>,
    #[serde(default)]
    pub overall_comments: Option<String>,
    #[serde(default)]
    pub technical_skills_rating: Option<i16>,
    #[serde(default)]
    pub problem_solving_rating: Option<i16>,
    #[serde(default)]
    pub communication_rating: Option<i16>,
    #[serde(default)]
    pub cultural_fit_rating: Option<i16>,
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let ratings = [
            ("technical_skills_rating", self.technical_skills_rating),
            ("problem_solving_rating", self.problem_solving_rating),
            ("communication_rating", self.communication_rating),
            ("cultural_fit_rating", self.cultural_fit_rating),
        ];
        for (name, rating) in ratings {
            if let Some(r) = rating {
                if !(1..=5).contains(&r) {
                    return Err(AppError::Validation(format!("{name} must be between 1 and 5")));
                }
            }
        }
        let comments = [
            &self.technical_comments,
            &self.communication_comments,
            &self.overall_comments,
        ];
        if comments
            .iter()
            .any(|c| c.as_deref().is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS))
        {
            return Err(AppError::Validation(format!(
                "Comments must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Stores (or replaces) the feedback for an assignment and closes the assignment.
pub async fn submit_feedback(
    pool: &PgPool,
    assignment: &TechnicalInterviewAssignment,
    req: &FeedbackRequest,
) -> Result<TechnicalInterviewFeedback, AppError> {
    req.validate()?;
    if assignment.status == AssignmentStatus::Cancelled {
        return Err(AppError::Validation("Assignment has been cancelled".into()));
    }

    let mut tx = pool.begin().await?;
    let feedback: TechnicalInterviewFeedback = sqlx::query_as(
        r#"
        INSERT INTO technical_interview_feedback
            (id, assignment_id, decision, technical_comments, communication_comments,
             overall_comments, technical_skills_rating, problem_solving_rating,
             communication_rating, cultural_fit_rating, requires_second_round)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (assignment_id) DO UPDATE SET
            decision = EXCLUDED.decision,
            technical_comments = EXCLUDED.technical_comments,
            communication_comments = EXCLUDED.communication_comments,
            overall_comments = EXCLUDED.overall_comments,
            technical_skills_rating = EXCLUDED.technical_skills_rating,
            problem_solving_rating = EXCLUDED.problem_solving_rating,
            communication_rating = EXCLUDED.communication_rating,
            cultural_fit_rating = EXCLUDED.cultural_fit_rating,
            requires_second_round = EXCLUDED.requires_second_round,
            submitted_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(assignment.id)
    .bind(req.decision)
    .bind(req.technical_comments.as_deref())
    .bind(req.communication_comments.as_deref())
    .bind(req.overall_comments.as_deref())
    .bind(req.technical_skills_rating)
    .bind(req.problem_solving_rating)
    .bind(req.communication_rating)
    .bind(req.cultural_fit_rating)
    .bind(req.decision.requires_second_round())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE technical_interview_assignments SET status = 'completed' WHERE id = $1")
        .bind(assignment.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if feedback.requires_second_round {
        info!(
            assignment_id = %assignment.id,
            candidate_id = %assignment.candidate_id,
            "Second round requested"
        );
    }
    Ok(feedback)
}

/// An assignment with the names a dashboard shows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AssignmentSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub assignment: TechnicalInterviewAssignment,
    pub interview_title: String,
    pub candidate_email: String,
    pub candidate_first_name: Option<String>,
    pub candidate_last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TechnicalDashboard {
    pub pending_count: usize,
    pub completed_count: usize,
    pub pending: Vec<AssignmentSummary>,
    /// Pending assignments dated within the next week; a subset of `pending`.
    pub upcoming_interviews: Vec<AssignmentSummary>,
    pub recent_completed: Vec<AssignmentSummary>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT a.*,
           i.title AS interview_title,
           u.email AS candidate_email,
           u.first_name AS candidate_first_name,
           u.last_name AS candidate_last_name
    FROM technical_interview_assignments a
    JOIN interviews i ON i.id = a.interview_id
    JOIN users u ON u.id = a.candidate_id
"#;

/// Pending assignments with a date inside the upcoming window.
pub fn is_upcoming(assignment: &TechnicalInterviewAssignment, now: DateTime<Utc>) -> bool {
    assignment.status == AssignmentStatus::Pending
        && assignment
            .interview_date
            .is_some_and(|at| at >= now && at <= now + Duration::days(UPCOMING_WINDOW_DAYS))
}

pub async fn dashboard(
    pool: &PgPool,
    technical_person_id: Uuid,
) -> Result<TechnicalDashboard, sqlx::Error> {
    let pending: Vec<AssignmentSummary> = sqlx::query_as(&format!(
        "{SUMMARY_SELECT} WHERE a.technical_person_id = $1 AND a.status = 'pending' \
         ORDER BY a.interview_date ASC NULLS LAST"
    ))
    .bind(technical_person_id)
    .fetch_all(pool)
    .await?;

    let recent_completed: Vec<AssignmentSummary> = sqlx::query_as(&format!(
        "{SUMMARY_SELECT} WHERE a.technical_person_id = $1 AND a.status = 'completed' \
         ORDER BY a.interview_date DESC NULLS LAST LIMIT $2"
    ))
    .bind(technical_person_id)
    .bind(RECENT_COMPLETED_LIMIT)
    .fetch_all(pool)
    .await?;

    let completed_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM technical_interview_assignments \
         WHERE technical_person_id = $1 AND status = 'completed'",
    )
    .bind(technical_person_id)
    .fetch_one(pool)
    .await?;

    let now = Utc::now();
    let upcoming_interviews = pending
        .iter()
        .filter(|s| is_upcoming(&s.assignment, now))
        .cloned()
        .collect();

    Ok(TechnicalDashboard {
        pending_count: pending.len(),
        completed_count: usize::try_from(completed_count).unwrap_or(0),
        pending,
        upcoming_interviews,
        recent_completed,
    })
}

/// Feedback in an organization that asked for another round.
#[derive(Debug, Serialize, FromRow)]
pub struct SecondRoundRequest {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub feedback: TechnicalInterviewFeedback,
    pub interview_id: Uuid,
    pub candidate_id: Uuid,
    pub technical_person_id: Uuid,
}

pub async fn pending_second_rounds(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<SecondRoundRequest>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT f.*, a.interview_id, a.candidate_id, a.technical_person_id
        FROM technical_interview_feedback f
        JOIN technical_interview_assignments a ON a.id = f.assignment_id
        WHERE a.organization_id = $1 AND f.requires_second_round
        ORDER BY f.submitted_at DESC
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Recruiters and admins of the organization, who hear about new feedback.
pub async fn organization_reviewers(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM users
        WHERE organization_id = $1 AND role IN ('recruiter', 'admin') AND user_active
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::types::Json;

    use super::*;
    use crate::models::interview::InterviewType;
    use crate::models::user::fixtures::user;

    fn interview(org: Uuid) -> Interview {
        Interview {
            id: Uuid::new_v4(),
            title: "Platform Engineer".into(),
            job_description: "Kubernetes".into(),
            questions: Json(vec![]),
            duration_minutes: 60,
            recruiter_id: Uuid::new_v4(),
            organization_id: org,
            interview_type: InterviewType::Scheduled,
            cross_org_accessible: false,
            public_invitation_enabled: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn assignment(status: AssignmentStatus, date: Option<DateTime<Utc>>) -> TechnicalInterviewAssignment {
        TechnicalInterviewAssignment {
            id: Uuid::new_v4(),
            interview_id: Uuid::new_v4(),
            technical_person_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            assigned_by: Uuid::new_v4(),
            interview_date: date,
            meeting_link: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_assignment_requires_technical_person_in_org() {
        let org = Uuid::new_v4();
        let iv = interview(org);
        let candidate = user(UserRole::Candidate, Some(Uuid::new_v4()));

        let reviewer = user(UserRole::TechnicalPerson, Some(org));
        assert!(check_assignment(&iv, &reviewer, &candidate).is_ok());

        let recruiter = user(UserRole::Recruiter, Some(org));
        assert!(check_assignment(&iv, &recruiter, &candidate).is_err());

        let outsider = user(UserRole::TechnicalPerson, Some(Uuid::new_v4()));
        assert!(check_assignment(&iv, &outsider, &candidate).is_err());

        let mut disabled = reviewer.clone();
        disabled.user_active = false;
        assert!(check_assignment(&iv, &disabled, &candidate).is_err());

        let not_candidate = user(UserRole::Admin, Some(org));
        assert!(check_assignment(&iv, &reviewer, &not_candidate).is_err());
    }

    #[test]
    fn test_ratings_must_be_one_to_five() {
        let ok: FeedbackRequest = serde_json::from_value(json!({
            "decision": "selected",
            "technical_skills_rating": 5,
            "cultural_fit_rating": 1
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        for bad in [0, 6] {
            let req: FeedbackRequest = serde_json::from_value(json!({
                "decision": "rejected",
                "problem_solving_rating": bad
            }))
            .unwrap();
            let Err(AppError::Validation(msg)) = req.validate() else {
                panic!("rating {bad} accepted");
            };
            assert!(msg.contains("problem_solving_rating"));
        }
    }

    #[test]
    fn test_second_round_decision_parses() {
        let req: FeedbackRequest =
            serde_json::from_value(json!({"decision": "second_round"})).unwrap();
        assert!(req.decision.requires_second_round());
        assert!(serde_json::from_value::<FeedbackRequest>(json!({"decision": "maybe"})).is_err());
    }

    #[test]
    fn test_upcoming_window() {
        let now = Utc::now();
        assert!(is_upcoming(
            &assignment(AssignmentStatus::Pending, Some(now + Duration::days(2))),
            now
        ));
        assert!(!is_upcoming(
            &assignment(AssignmentStatus::Pending, Some(now + Duration::days(8))),
            now
        ));
        assert!(!is_upcoming(
            &assignment(AssignmentStatus::Pending, Some(now - Duration::hours(1))),
            now
        ));
        assert!(!is_upcoming(&assignment(AssignmentStatus::Pending, None), now));
        assert!(!is_upcoming(
            &assignment(AssignmentStatus::Completed, Some(now + Duration::days(1))),
            now
        ));
    }
}
