use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_mins: i64,
    /// Absent key disables the chat client; every AI wrapper then serves its fallback.
    pub openai_api_key: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from_email: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub base_url: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expiry_mins: std::env::var("JWT_EXPIRY_MINS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<i64>()
                .context("JWT_EXPIRY_MINS must be an integer")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            sendgrid_api_key: optional_env("SENDGRID_API_KEY"),
            sendgrid_from_email: std::env::var("SENDGRID_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@talentiq.com".to_string()),
            twilio_account_sid: optional_env("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional_env("TWILIO_AUTH_TOKEN"),
            twilio_from_number: optional_env("TWILIO_FROM_NUMBER"),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats unset and empty variables the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
