use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub branding_config: Value,
    pub subscription_plan: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Column values for a new organization row.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub branding_config: Value,
    pub subscription_plan: String,
}
