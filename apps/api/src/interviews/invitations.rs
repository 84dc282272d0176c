//! Interview invitations.
//!
//! A recruiter may invite members of their own organization to any interview they manage
//! ("direct"). Inviting a candidate from another organization is a public invitation and
//! has extra preconditions: the interview must allow public invitations, the candidate's
//! profile must be public, and the candidate may hold at most
//! [`MAX_PENDING_INVITATIONS`] pending invitations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::{is_unique_violation, AppError};
use crate::models::interview::{Interview, InterviewInvitation, InvitationStatus};
use crate::models::user::{User, UserRole};

pub const MAX_PENDING_INVITATIONS: i64 = 5;
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    Direct,
    Public,
}

impl InvitationKind {
    pub fn between(interview: &Interview, candidate: &User) -> Self {
        if candidate.organization_id == Some(interview.organization_id) {
            InvitationKind::Direct
        } else {
            InvitationKind::Public
        }
    }
}

/// What the database knows about the candidate's invitations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationState {
    pub already_invited: bool,
    pub pending_count: i64,
}

/// Checks every precondition for inviting `candidate` to `interview`.
pub fn check_invitation(
    interview: &Interview,
    candidate: &User,
    state: InvitationState,
) -> Result<InvitationKind, AppError> {
    if candidate.role != UserRole::Candidate || !candidate.user_active {
        return Err(AppError::Validation("Only active candidates can be invited".into()));
    }
    if !interview.is_active {
        return Err(AppError::Validation("Interview is no longer active".into()));
    }
    let kind = InvitationKind::between(interview, candidate);
    if kind == InvitationKind::Public {
        if !candidate.public_profile_enabled {
            return Err(AppError::Forbidden(
                "Candidate's profile is not publicly accessible".into(),
            ));
        }
        if !interview.public_invitation_enabled {
            return Err(AppError::Forbidden(
                "Interview does not support public invitations".into(),
            ));
        }
    }
    if state.already_invited {
        return Err(AppError::Conflict(
            "Candidate already has an invitation for this interview".into(),
        ));
    }
    if kind == InvitationKind::Public && state.pending_count >= MAX_PENDING_INVITATIONS {
        return Err(AppError::Conflict(
            "Candidate has reached maximum concurrent interview invitations".into(),
        ));
    }
    Ok(kind)
}

pub fn default_message(interview: &Interview) -> String {
    format!("You've been invited to participate in: {}", interview.title)
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(INVITATION_TTL_DAYS)
}

pub async fn load_invitation_state(
    pool: &PgPool,
    interview_id: Uuid,
    candidate_id: Uuid,
) -> Result<InvitationState, sqlx::Error> {
    let (already_invited, pending_count): (bool, i64) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM interview_invitations
                    WHERE interview_id = $1 AND candidate_id = $2),
            (SELECT COUNT(*) FROM interview_invitations
              WHERE candidate_id = $2 AND status = 'pending' AND expires_at > now())
        "#,
    )
    .bind(interview_id)
    .bind(candidate_id)
    .fetch_one(pool)
    .await?;
    Ok(InvitationState {
        already_invited,
        pending_count,
    })
}

pub async fn create_invitation(
    pool: &PgPool,
    interview: &Interview,
    candidate: &User,
    recruiter_id: Uuid,
    message: Option<String>,
) -> Result<(InterviewInvitation, InvitationKind), AppError> {
    let state = load_invitation_state(pool, interview.id, candidate.id).await?;
    let kind = check_invitation(interview, candidate, state)?;

    let message = message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default_message(interview));
    let result = sqlx::query_as::<_, InterviewInvitation>(
        r#"
        INSERT INTO interview_invitations
            (id, interview_id, candidate_id, recruiter_id, organization_id, status, message,
             is_cross_organization, expires_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interview.id)
    .bind(candidate.id)
    .bind(recruiter_id)
    .bind(interview.organization_id)
    .bind(message)
    .bind(kind == InvitationKind::Public)
    .bind(expiry_from(Utc::now()))
    .fetch_one(pool)
    .await;

    match result {
        Ok(invitation) => {
            info!(
                interview_id = %interview.id,
                candidate_id = %candidate.id,
                kind = ?kind,
                "Invitation created"
            );
            Ok((invitation, kind))
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
            "Candidate already has an invitation for this interview".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationReply {
    Accept,
    Decline,
}

/// Next status for a candidate's reply. Expired invitations become `Expired` and the
/// reply is refused.
pub fn reply_transition(
    invitation: &InterviewInvitation,
    reply: InvitationReply,
    now: DateTime<Utc>,
) -> Result<InvitationStatus, InvitationStatus> {
    if invitation.is_expired(now) {
        return Err(InvitationStatus::Expired);
    }
    if !invitation.status.is_pending() {
        return Err(invitation.status);
    }
    Ok(match reply {
        InvitationReply::Accept => InvitationStatus::Accepted,
        InvitationReply::Decline => InvitationStatus::Declined,
    })
}

/// Applies a candidate's reply to their own invitation.
pub async fn respond_to_invitation(
    pool: &PgPool,
    invitation_id: Uuid,
    candidate_id: Uuid,
    reply: InvitationReply,
) -> Result<InterviewInvitation, AppError> {
    let invitation: Option<InterviewInvitation> =
        sqlx::query_as("SELECT * FROM interview_invitations WHERE id = $1")
            .bind(invitation_id)
            .fetch_optional(pool)
            .await?;
    let invitation = invitation
        .filter(|i| i.candidate_id == candidate_id)
        .ok_or_else(|| AppError::NotFound("Invitation not found".into()))?;

    match reply_transition(&invitation, reply, Utc::now()) {
        Ok(status) => {
            let updated: InterviewInvitation = sqlx::query_as(
                r#"
                UPDATE interview_invitations SET status = $2, responded_at = now()
                WHERE id = $1 AND status = 'pending'
                RETURNING *
                "#,
            )
            .bind(invitation.id)
            .bind(status)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::Conflict("Invitation was already answered".into()))?;
            Ok(updated)
        }
        Err(InvitationStatus::Expired) => {
            sqlx::query(
                "UPDATE interview_invitations SET status = 'expired' WHERE id = $1 AND status = 'pending'",
            )
            .bind(invitation.id)
            .execute(pool)
            .await?;
            Err(AppError::Validation("Invitation has expired".into()))
        }
        Err(_) => Err(AppError::Conflict("Invitation was already answered".into())),
    }
}

/// A candidate's invitation with the interview and organization it belongs to.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CandidateInvitation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invitation: InterviewInvitation,
    pub interview_title: String,
    pub organization_name: String,
}

/// Pending invitations past their deadline are reported as expired.
pub async fn list_for_candidate(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Vec<CandidateInvitation>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT inv.id, inv.interview_id, inv.candidate_id, inv.recruiter_id, inv.organization_id,
               CASE WHEN inv.status = 'pending' AND inv.expires_at <= now()
                    THEN 'expired'::invitation_status ELSE inv.status END AS status,
               inv.message, inv.is_cross_organization, inv.invited_at, inv.expires_at,
               inv.responded_at,
               i.title AS interview_title,
               o.name AS organization_name
        FROM interview_invitations inv
        JOIN interviews i ON i.id = inv.interview_id
        JOIN organizations o ON o.id = inv.organization_id
        WHERE inv.candidate_id = $1
        ORDER BY inv.invited_at DESC
        "#,
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;

    use super::*;
    use crate::models::interview::InterviewType;
    use crate::models::user::fixtures::user;

    fn interview(org: Uuid, public_invitations: bool) -> Interview {
        Interview {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            job_description: "Rust services".into(),
            questions: Json(vec![]),
            duration_minutes: 30,
            recruiter_id: Uuid::new_v4(),
            organization_id: org,
            interview_type: InterviewType::Private,
            cross_org_accessible: false,
            public_invitation_enabled: public_invitations,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn invitation(status: InvitationStatus, expires_in_days: i64) -> InterviewInvitation {
        let now = Utc::now();
        InterviewInvitation {
            id: Uuid::new_v4(),
            interview_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            recruiter_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            status,
            message: None,
            is_cross_organization: false,
            invited_at: now,
            expires_at: now + Duration::days(expires_in_days),
            responded_at: None,
        }
    }

    #[test]
    fn test_direct_invitation_ignores_public_rules() {
        let org = Uuid::new_v4();
        let mut candidate = user(UserRole::Candidate, Some(org));
        candidate.public_profile_enabled = false;
        let state = InvitationState {
            already_invited: false,
            pending_count: 9,
        };
        let kind = check_invitation(&interview(org, false), &candidate, state).unwrap();
        assert_eq!(kind, InvitationKind::Direct);
    }

    #[test]
    fn test_public_invitation_preconditions() {
        let org = Uuid::new_v4();
        let candidate = user(UserRole::Candidate, Some(Uuid::new_v4()));
        let ok = InvitationState::default();

        assert_eq!(
            check_invitation(&interview(org, true), &candidate, ok).unwrap(),
            InvitationKind::Public
        );
        assert!(matches!(
            check_invitation(&interview(org, false), &candidate, ok),
            Err(AppError::Forbidden(_))
        ));

        let mut private = candidate.clone();
        private.public_profile_enabled = false;
        assert!(matches!(
            check_invitation(&interview(org, true), &private, ok),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_pending_limit_and_duplicates() {
        let org = Uuid::new_v4();
        let candidate = user(UserRole::Candidate, Some(Uuid::new_v4()));
        let at_limit = InvitationState {
            already_invited: false,
            pending_count: MAX_PENDING_INVITATIONS,
        };
        let Err(AppError::Conflict(msg)) = check_invitation(&interview(org, true), &candidate, at_limit)
        else {
            panic!("expected conflict");
        };
        assert!(msg.contains("maximum"));

        let below = InvitationState {
            already_invited: false,
            pending_count: MAX_PENDING_INVITATIONS - 1,
        };
        assert!(check_invitation(&interview(org, true), &candidate, below).is_ok());

        let duplicate = InvitationState {
            already_invited: true,
            pending_count: 0,
        };
        assert!(matches!(
            check_invitation(&interview(org, true), &candidate, duplicate),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_only_candidates_are_invited() {
        let org = Uuid::new_v4();
        let recruiter = user(UserRole::Recruiter, Some(org));
        assert!(matches!(
            check_invitation(&interview(org, true), &recruiter, InvitationState::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_expiry_is_seven_days() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, Duration::days(7));
        assert_eq!(
            default_message(&interview(Uuid::new_v4(), false)),
            "You've been invited to participate in: Backend Engineer"
        );
    }

    #[test]
    fn test_reply_transitions() {
        let now = Utc::now();
        let pending = invitation(InvitationStatus::Pending, 3);
        assert_eq!(
            reply_transition(&pending, InvitationReply::Accept, now),
            Ok(InvitationStatus::Accepted)
        );
        assert_eq!(
            reply_transition(&pending, InvitationReply::Decline, now),
            Ok(InvitationStatus::Declined)
        );

        let stale = invitation(InvitationStatus::Pending, -1);
        assert_eq!(
            reply_transition(&stale, InvitationReply::Accept, now),
            Err(InvitationStatus::Expired)
        );

        let answered = invitation(InvitationStatus::Declined, 3);
        assert_eq!(
            reply_transition(&answered, InvitationReply::Accept, now),
            Err(InvitationStatus::Declined)
        );
    }
}
