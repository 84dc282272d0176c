//! Booking interview slots and telling candidates about them.
//!
//! Bulk scheduling runs the single-slot path for each entry. A failing entry is logged
//! and reported back; entries already booked stay booked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{Interview, InterviewSchedule};
use crate::models::user::{User, UserRole};
use crate::notifications::{deliver, templates, DeliveryReport, Notifier, Recipient};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
const MIN_DURATION_MINUTES: i32 = 15;
const MAX_DURATION_MINUTES: i32 = 480;
const MAX_BULK_ENTRIES: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub candidate_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ScheduleRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.scheduled_at <= now {
            return Err(AppError::Validation(
                "Interview must be scheduled in the future".into(),
            ));
        }
        let duration = self.duration();
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
            return Err(AppError::Validation(format!(
                "Duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if let Some(link) = self.meeting_link.as_deref() {
            if !(link.starts_with("https://") || link.starts_with("http://")) {
                return Err(AppError::Validation("Meeting link must be an http(s) URL".into()));
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> i32 {
        self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    pub fn time_zone(&self) -> &str {
        self.time_zone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .unwrap_or("UTC")
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduledSlot {
    pub schedule: InterviewSchedule,
    pub notification: DeliveryReport,
}

async fn load_candidate(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match user {
        Some(u) if u.role == UserRole::Candidate && u.user_active => Ok(u),
        Some(_) => Err(AppError::Validation(format!("User {id} is not an active candidate"))),
        None => Err(AppError::NotFound(format!("Candidate {id} not found"))),
    }
}

/// Books one slot. Any live booking for the same candidate and interview is cancelled
/// first so the candidate holds at most one `scheduled` slot per interview.
pub async fn schedule_interview(
    pool: &PgPool,
    notifier: &dyn Notifier,
    interview: &Interview,
    recruiter_id: Uuid,
    req: &ScheduleRequest,
) -> Result<ScheduledSlot, AppError> {
    req.validate(Utc::now())?;
    if !interview.is_active {
        return Err(AppError::Validation("Interview is no longer active".into()));
    }
    let candidate = load_candidate(pool, req.candidate_id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        UPDATE interview_schedules SET status = 'cancelled'
        WHERE interview_id = $1 AND candidate_id = $2 AND status = 'scheduled'
        "#,
    )
    .bind(interview.id)
    .bind(candidate.id)
    .execute(&mut *tx)
    .await?;

    let schedule: InterviewSchedule = sqlx::query_as(
        r#"
        INSERT INTO interview_schedules
            (id, interview_id, candidate_id, recruiter_id, scheduled_at, duration_minutes,
             status, meeting_link, time_zone, notes)
        VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interview.id)
    .bind(candidate.id)
    .bind(recruiter_id)
    .bind(req.scheduled_at)
    .bind(req.duration())
    .bind(req.meeting_link.as_deref())
    .bind(req.time_zone())
    .bind(req.notes.as_deref())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        schedule_id = %schedule.id,
        interview_id = %interview.id,
        candidate_id = %candidate.id,
        "Interview scheduled"
    );

    let notification = templates::interview_scheduled(
        &candidate.full_name(),
        &interview.title,
        schedule.scheduled_at,
        schedule.duration_minutes,
        &schedule.time_zone,
        schedule.meeting_link.as_deref(),
    );
    let report = deliver(
        notifier,
        Recipient {
            email: &candidate.email,
            phone: candidate.phone.as_deref(),
        },
        &notification,
    )
    .await;

    Ok(ScheduledSlot {
        schedule,
        notification: report,
    })
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub candidate_id: Uuid,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkScheduleResult {
    pub scheduled: Vec<ScheduledSlot>,
    pub failed: Vec<BulkFailure>,
}

pub fn check_bulk_size(entries: &[ScheduleRequest]) -> Result<(), AppError> {
    if entries.is_empty() {
        return Err(AppError::Validation("No schedules given".into()));
    }
    if entries.len() > MAX_BULK_ENTRIES {
        return Err(AppError::Validation(format!(
            "At most {MAX_BULK_ENTRIES} schedules per request"
        )));
    }
    Ok(())
}

pub async fn schedule_bulk(
    pool: &PgPool,
    notifier: &dyn Notifier,
    interview: &Interview,
    recruiter_id: Uuid,
    entries: &[ScheduleRequest],
) -> Result<BulkScheduleResult, AppError> {
    check_bulk_size(entries)?;

    let mut result = BulkScheduleResult::default();
    for entry in entries {
        match schedule_interview(pool, notifier, interview, recruiter_id, entry).await {
            Ok(slot) => result.scheduled.push(slot),
            Err(e) => {
                warn!(
                    interview_id = %interview.id,
                    candidate_id = %entry.candidate_id,
                    "Bulk scheduling entry failed: {e}"
                );
                result.failed.push(BulkFailure {
                    candidate_id: entry.candidate_id,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(result)
}

/// Marks the candidate's live booking as completed after they submit.
pub async fn mark_completed(
    pool: &PgPool,
    interview_id: Uuid,
    candidate_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(
        r#"
        UPDATE interview_schedules SET status = 'completed'
        WHERE interview_id = $1 AND candidate_id = $2 AND status = 'scheduled'
        "#,
    )
    .bind(interview_id)
    .bind(candidate_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> ScheduleRequest {
        serde_json::from_value(value).unwrap()
    }

    fn at(offset_hours: i64) -> String {
        (Utc::now() + Duration::hours(offset_hours)).to_rfc3339()
    }

    #[test]
    fn test_defaults_for_duration_and_time_zone() {
        let req = request(json!({
            "candidate_id": Uuid::new_v4(),
            "scheduled_at": at(24),
            "time_zone": "  "
        }));
        assert_eq!(req.duration(), 60);
        assert_eq!(req.time_zone(), "UTC");
        assert!(req.validate(Utc::now()).is_ok());
    }

    #[test]
    fn test_past_slots_and_bad_durations_rejected() {
        let past = request(json!({"candidate_id": Uuid::new_v4(), "scheduled_at": at(-1)}));
        assert!(matches!(past.validate(Utc::now()), Err(AppError::Validation(_))));

        let short = request(json!({
            "candidate_id": Uuid::new_v4(), "scheduled_at": at(2), "duration_minutes": 5
        }));
        assert!(matches!(short.validate(Utc::now()), Err(AppError::Validation(_))));

        let bad_link = request(json!({
            "candidate_id": Uuid::new_v4(), "scheduled_at": at(2),
            "meeting_link": "zoom meeting 123"
        }));
        assert!(matches!(bad_link.validate(Utc::now()), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bulk_size_limits() {
        assert!(check_bulk_size(&[]).is_err());
        let one = request(json!({"candidate_id": Uuid::new_v4(), "scheduled_at": at(3)}));
        assert!(check_bulk_size(std::slice::from_ref(&one)).is_ok());
        let many = vec![one; MAX_BULK_ENTRIES + 1];
        assert!(check_bulk_size(&many).is_err());
    }
}
