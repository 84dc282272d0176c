//! Direct messages between users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::message::Message;
use crate::models::user::UserRole;

pub const MESSAGE_TYPES: &[&str] = &["direct", "application", "interview", "system"];
pub const PRIORITIES: &[&str] = &["low", "normal", "high", "urgent"];
pub const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;
const MAX_SUBJECT_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 10_000;

fn default_message_type() -> String {
    "direct".to_string()
}

fn default_priority() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub subject: String,
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let subject = self.subject.trim();
        if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(AppError::Validation(format!(
                "Subject must be 1 to {MAX_SUBJECT_CHARS} characters"
            )));
        }
        let content = self.content.trim();
        if content.is_empty() || content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AppError::Validation(format!(
                "Message must be 1 to {MAX_CONTENT_CHARS} characters"
            )));
        }
        if !MESSAGE_TYPES.contains(&self.message_type.as_str()) {
            return Err(AppError::Validation(format!(
                "message_type must be one of: {}",
                MESSAGE_TYPES.join(", ")
            )));
        }
        if !PRIORITIES.contains(&self.priority.as_str()) {
            return Err(AppError::Validation(format!(
                "priority must be one of: {}",
                PRIORITIES.join(", ")
            )));
        }
        Ok(())
    }
}

pub fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
}

pub async fn send_message(
    pool: &PgPool,
    sender_id: Uuid,
    req: &SendMessageRequest,
) -> Result<Message, AppError> {
    req.validate()?;
    let message = sqlx::query_as(
        r#"
        INSERT INTO messages (id, sender_id, recipient_id, subject, content, message_type, priority)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(sender_id)
    .bind(req.recipient_id)
    .bind(req.subject.trim())
    .bind(req.content.trim())
    .bind(&req.message_type)
    .bind(&req.priority)
    .fetch_one(pool)
    .await?;
    Ok(message)
}

#[derive(Debug, FromRow)]
struct ConversationRow {
    partner_id: Uuid,
    partner_first_name: Option<String>,
    partner_last_name: Option<String>,
    partner_username: String,
    partner_role: UserRole,
    partner_organization: Option<String>,
    latest_id: Uuid,
    latest_subject: String,
    latest_content: String,
    latest_sender_id: Uuid,
    latest_is_read: bool,
    latest_created_at: DateTime<Utc>,
    unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct LatestMessage {
    pub id: Uuid,
    pub subject: String,
    pub content: String,
    pub sender_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Conversation {
    pub partner_id: Uuid,
    pub partner_name: String,
    pub partner_role: UserRole,
    pub partner_organization: Option<String>,
    pub latest_message: LatestMessage,
    pub unread_count: i64,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        let partner_name = match (row.partner_first_name, row.partner_last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f,
            (None, Some(l)) => l,
            (None, None) => row.partner_username,
        };
        Self {
            partner_id: row.partner_id,
            partner_name,
            partner_role: row.partner_role,
            partner_organization: row.partner_organization,
            latest_message: LatestMessage {
                id: row.latest_id,
                subject: row.latest_subject,
                content: row.latest_content,
                sender_id: row.latest_sender_id,
                is_read: row.latest_is_read,
                created_at: row.latest_created_at,
            },
            unread_count: row.unread_count,
        }
    }
}

/// One entry per conversation partner, newest conversation first.
pub async fn conversations(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Conversation>, sqlx::Error> {
    let rows: Vec<ConversationRow> = sqlx::query_as(
        r#"
        WITH mine AS (
            SELECT m.*,
                   CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END AS partner_id
            FROM messages m
            WHERE m.sender_id = $1 OR m.recipient_id = $1
        ),
        latest AS (
            SELECT DISTINCT ON (partner_id) *
            FROM mine
            ORDER BY partner_id, created_at DESC
        )
        SELECT l.partner_id,
               u.first_name AS partner_first_name,
               u.last_name  AS partner_last_name,
               u.username   AS partner_username,
               u.role       AS partner_role,
               o.name       AS partner_organization,
               l.id         AS latest_id,
               l.subject    AS latest_subject,
               l.content    AS latest_content,
               l.sender_id  AS latest_sender_id,
               l.is_read    AS latest_is_read,
               l.created_at AS latest_created_at,
               (SELECT COUNT(*) FROM mine x
                 WHERE x.partner_id = l.partner_id AND x.recipient_id = $1 AND NOT x.is_read)
                 AS unread_count
        FROM latest l
        JOIN users u ON u.id = l.partner_id
        LEFT JOIN organizations o ON o.id = u.organization_id
        ORDER BY l.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Conversation::from).collect())
}

/// The latest `limit` messages between two users, oldest first. Messages the partner
/// sent to `user_id` are marked read.
pub async fn thread(
    pool: &PgPool,
    user_id: Uuid,
    partner_id: Uuid,
    limit: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let mut messages: Vec<Message> = sqlx::query_as(
        r#"
        SELECT * FROM messages
        WHERE (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(partner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    messages.reverse();

    sqlx::query(
        r#"
        UPDATE messages SET is_read = TRUE, read_at = now()
        WHERE sender_id = $2 AND recipient_id = $1 AND NOT is_read
        "#,
    )
    .bind(user_id)
    .bind(partner_id)
    .execute(pool)
    .await?;

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> SendMessageRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_and_validation() {
        let ok = request(json!({
            "recipient_id": Uuid::new_v4(),
            "subject": "Next steps",
            "content": "Are you free on Tuesday?"
        }));
        assert_eq!(ok.message_type, "direct");
        assert_eq!(ok.priority, "normal");
        assert!(ok.validate().is_ok());

        let blank = request(json!({
            "recipient_id": Uuid::new_v4(), "subject": " ", "content": "hi"
        }));
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let bad_priority = request(json!({
            "recipient_id": Uuid::new_v4(), "subject": "s", "content": "c", "priority": "asap"
        }));
        let Err(AppError::Validation(msg)) = bad_priority.validate() else {
            panic!("priority accepted");
        };
        assert!(msg.contains("urgent"));
    }

    #[test]
    fn test_page_limit_is_clamped() {
        assert_eq!(page_limit(None), 50);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_limit(Some(1_000)), 200);
    }

    #[test]
    fn test_partner_name_falls_back_to_username() {
        let row = ConversationRow {
            partner_id: Uuid::new_v4(),
            partner_first_name: None,
            partner_last_name: None,
            partner_username: "jdoe".into(),
            partner_role: UserRole::Recruiter,
            partner_organization: Some("TechCorp Solutions".into()),
            latest_id: Uuid::new_v4(),
            latest_subject: "Hello".into(),
            latest_content: "Hi there".into(),
            latest_sender_id: Uuid::new_v4(),
            latest_is_read: false,
            latest_created_at: Utc::now(),
            unread_count: 2,
        };
        let conversation = Conversation::from(row);
        assert_eq!(conversation.partner_name, "jdoe");
        assert_eq!(conversation.unread_count, 2);
    }
}
