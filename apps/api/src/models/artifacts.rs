use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Uploaded resume with its extracted text and parsed profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_filename: String,
    pub storage_key: String,
    pub extracted_text: String,
    pub parsed_data: Value,
    pub generated_by_ai: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoverLetter {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company_name: String,
    pub job_title: String,
    pub content: String,
    pub template_type: String,
    pub tone: String,
    pub key_points: Json<Vec<String>>,
    pub suggestions: Json<Vec<String>>,
    pub generated_by_ai: bool,
    pub generation_model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvAnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub overall_score: f64,
    pub analysis: Value,
    pub generated_by_ai: bool,
    pub created_at: DateTime<Utc>,
}
