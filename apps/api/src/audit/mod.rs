//! Append-only audit trail.
//!
//! Rows are only ever inserted; the table carries a trigger that rejects UPDATE and
//! DELETE. Writes are best-effort from the caller's point of view: a failed audit insert
//! is logged and never fails the request that triggered it.

pub mod handlers;

use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub action: &'static str,
    pub resource_type: &'static str,
    pub resource_id: Option<String>,
    pub details: Value,
}

impl AuditEntry {
    pub fn new(action: &'static str, resource_type: &'static str) -> Self {
        Self {
            user_id: None,
            organization_id: None,
            action,
            resource_type,
            resource_id: None,
            details: Value::Object(Default::default()),
        }
    }

    pub fn by(mut self, user_id: Uuid, organization_id: Option<Uuid>) -> Self {
        self.user_id = Some(user_id);
        self.organization_id = organization_id;
        self
    }

    pub fn resource(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

pub async fn insert(pool: &PgPool, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs
            (id, user_id, organization_id, action, resource_type, resource_id, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.organization_id)
    .bind(entry.action)
    .bind(entry.resource_type)
    .bind(&entry.resource_id)
    .bind(&entry.details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts `entry`, logging instead of failing.
pub async fn record(pool: &PgPool, entry: AuditEntry) {
    if let Err(e) = insert(pool, &entry).await {
        warn!(
            action = entry.action,
            resource_type = entry.resource_type,
            "Failed to write audit log: {e}"
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let entry = AuditEntry::new("interview_created", "interview")
            .by(user, Some(org))
            .resource(42)
            .details(json!({"title": "Backend"}));
        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.organization_id, Some(org));
        assert_eq!(entry.resource_id.as_deref(), Some("42"));
        assert_eq!(entry.details["title"], "Backend");
    }

    #[test]
    fn test_default_details_is_empty_object() {
        let entry = AuditEntry::new("login", "user");
        assert_eq!(entry.details, json!({}));
        assert!(entry.user_id.is_none());
    }
}
