pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::resumes::uploads::{MAX_PHOTO_BYTES, MAX_RESUME_BYTES, MAX_VIDEO_BYTES};
use crate::state::AppState;
use crate::{
    analytics, audit, auth, candidates, interviews, messages, organizations, resumes, technical,
};

/// Multipart envelopes carry a few text fields next to the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

fn upload_limit(file_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(file_bytes + MULTIPART_OVERHEAD)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handlers::handle_register))
        .route(
            "/api/v1/auth/register/quick",
            post(auth::handlers::handle_quick_register),
        )
        .route(
            "/api/v1/auth/register/resume",
            post(auth::handlers::handle_resume_register).layer(upload_limit(MAX_RESUME_BYTES)),
        )
        .route("/api/v1/auth/login", post(auth::handlers::handle_login))
        .route("/api/v1/auth/me", get(auth::handlers::handle_me))
        .route("/api/v1/auth/users", post(auth::handlers::handle_create_staff))
        // Organizations
        .route(
            "/api/v1/organizations/stats",
            get(organizations::handlers::handle_organization_stats),
        )
        .route(
            "/api/v1/organizations/backfill",
            post(organizations::handlers::handle_backfill),
        )
        .route(
            "/api/v1/organizations/seed-demo",
            post(organizations::handlers::handle_seed_demo),
        )
        .route(
            "/api/v1/organizations/:slug/signup-link",
            get(organizations::handlers::handle_signup_link),
        )
        // Candidates
        .route(
            "/api/v1/candidates",
            get(candidates::handlers::handle_candidate_pool),
        )
        .route(
            "/api/v1/candidates/me",
            patch(candidates::handlers::handle_update_profile),
        )
        .route(
            "/api/v1/candidates/me/visibility",
            patch(candidates::handlers::handle_update_visibility),
        )
        .route(
            "/api/v1/candidates/:id",
            get(candidates::handlers::handle_get_candidate),
        )
        .route(
            "/api/v1/candidates/:id/employee-status",
            patch(candidates::handlers::handle_set_employee_status),
        )
        // Resumes, cover letters and AI analysis
        .route(
            "/api/v1/resumes",
            get(resumes::handlers::handle_list_resumes),
        )
        .route(
            "/api/v1/resumes/upload",
            post(resumes::handlers::handle_upload_resume).layer(upload_limit(MAX_RESUME_BYTES)),
        )
        .route(
            "/api/v1/cover-letters",
            get(resumes::handlers::handle_list_cover_letters)
                .post(resumes::handlers::handle_create_cover_letter),
        )
        .route(
            "/api/v1/cover-letters/templates",
            get(resumes::handlers::handle_cover_letter_templates),
        )
        .route(
            "/api/v1/cover-letters/analyze",
            post(resumes::handlers::handle_analyze_cover_letter),
        )
        .route(
            "/api/v1/cv-analysis",
            post(resumes::handlers::handle_cv_analysis).layer(upload_limit(MAX_RESUME_BYTES)),
        )
        .route("/api/v1/sentiment", post(resumes::handlers::handle_sentiment))
        .route(
            "/api/v1/uploads/photo",
            post(resumes::handlers::handle_upload_photo)
                .layer(upload_limit(MAX_PHOTO_BYTES)),
        )
        .route(
            "/api/v1/uploads/video",
            post(resumes::handlers::handle_upload_video)
                .layer(upload_limit(MAX_VIDEO_BYTES)),
        )
        // Interviews
        .route(
            "/api/v1/interviews",
            get(interviews::handlers::handle_list_interviews)
                .post(interviews::handlers::handle_create_interview),
        )
        .route(
            "/api/v1/interviews/:id",
            get(interviews::handlers::handle_get_interview),
        )
        .route(
            "/api/v1/interviews/:id/questions/generate",
            post(interviews::handlers::handle_generate_questions),
        )
        .route(
            "/api/v1/interviews/:id/apply",
            post(interviews::handlers::handle_apply),
        )
        .route(
            "/api/v1/interviews/:id/applications",
            get(interviews::handlers::handle_list_applications),
        )
        .route(
            "/api/v1/interviews/:id/invitations",
            post(interviews::handlers::handle_invite),
        )
        .route(
            "/api/v1/interviews/:id/schedules",
            post(interviews::handlers::handle_schedule),
        )
        .route(
            "/api/v1/interviews/:id/schedules/bulk",
            post(interviews::handlers::handle_schedule_bulk),
        )
        .route(
            "/api/v1/interviews/:id/responses",
            get(interviews::handlers::handle_list_responses)
                .post(interviews::handlers::handle_submit_response),
        )
        .route(
            "/api/v1/applications/:id/review",
            post(interviews::handlers::handle_review_application),
        )
        .route(
            "/api/v1/invitations/mine",
            get(interviews::handlers::handle_my_invitations),
        )
        .route(
            "/api/v1/invitations/:id/respond",
            post(interviews::handlers::handle_respond_invitation),
        )
        // Technical interviews
        .route(
            "/api/v1/technical/assignments",
            post(technical::handlers::handle_assign),
        )
        .route(
            "/api/v1/technical/assignments/:id",
            get(technical::handlers::handle_get_assignment),
        )
        .route(
            "/api/v1/technical/assignments/:id/feedback",
            post(technical::handlers::handle_submit_feedback),
        )
        .route(
            "/api/v1/technical/dashboard",
            get(technical::handlers::handle_dashboard),
        )
        .route(
            "/api/v1/technical/second-rounds",
            get(technical::handlers::handle_second_rounds),
        )
        // Messages
        .route(
            "/api/v1/messages",
            get(messages::handlers::handle_conversations)
                .post(messages::handlers::handle_send_message),
        )
        .route(
            "/api/v1/messages/:partner_id",
            get(messages::handlers::handle_thread),
        )
        // Analytics and audit
        .route(
            "/api/v1/analytics/dashboard",
            get(analytics::handlers::handle_dashboard),
        )
        .route("/api/v1/audit", get(audit::handlers::handle_list_audit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::accounts::memory::MemoryAccounts;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::llm_client::DisabledClient;
    use crate::models::user::UserRole;
    use crate::notifications::mock::RecordingNotifier;
    use crate::organizations::store::memory::MemoryOrganizationStore;
    use crate::storage::memory::MemoryObjectStore;

    const SECRET: &str = "router-test-secret";

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/talentiq".into(),
            s3_bucket: "talentiq".into(),
            s3_endpoint: "http://localhost:9000".into(),
            aws_access_key_id: "minio".into(),
            aws_secret_access_key: "minio123".into(),
            jwt_secret: SECRET.into(),
            jwt_expiry_mins: 60,
            openai_api_key: None,
            sendgrid_api_key: None,
            sendgrid_from_email: "noreply@talentiq.com".into(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_from_number: None,
            base_url: "http://localhost:8080".into(),
            port: 8080,
            rust_log: "info".into(),
        }
    }

    /// The pool never connects; these requests are all answered before any query runs.
    fn app(accounts: MemoryAccounts) -> Router {
        let config = config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState {
            db,
            storage: Arc::new(MemoryObjectStore::default()),
            ai: Arc::new(DisabledClient),
            notifier: Arc::new(RecordingNotifier::default()),
            organizations: Arc::new(MemoryOrganizationStore::default()),
            accounts: Arc::new(accounts),
            config,
        })
    }

    /// Token for a new user, recorded in `accounts` as enabled or disabled.
    fn bearer(accounts: &MemoryAccounts, role: UserRole, active: bool) -> String {
        let user_id = Uuid::new_v4();
        accounts.set(user_id, active);
        let token = generate_access_token(user_id, role, Some(Uuid::new_v4()), SECRET, 5).unwrap();
        format!("Bearer {token}")
    }

    async fn send(app: Router, uri: &str, auth: Option<String>) -> StatusCode {
        let mut req = Request::builder().uri(uri);
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        app.oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    async fn get(uri: &str, auth: Option<String>) -> StatusCode {
        send(app(MemoryAccounts::default()), uri, auth).await
    }

    #[tokio::test]
    async fn test_health_is_public() {
        assert_eq!(get("/health", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_token() {
        assert_eq!(get("/api/v1/auth/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            get("/api/v1/messages", Some("Bearer not-a-jwt".into())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_role_gates_reject_before_touching_the_database() {
        let accounts = MemoryAccounts::default();
        let candidate = bearer(&accounts, UserRole::Candidate, true);
        let app = app(accounts);
        assert_eq!(
            send(app.clone(), "/api/v1/technical/dashboard", Some(candidate.clone())).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(app, "/api/v1/analytics/dashboard", Some(candidate)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_disabled_account_is_rejected_with_a_valid_token() {
        let accounts = MemoryAccounts::default();
        let disabled = bearer(&accounts, UserRole::Candidate, false);
        let app = app(accounts);
        // This handler never loads the caller's row itself.
        assert_eq!(
            send(app.clone(), "/api/v1/invitations/mine", Some(disabled.clone())).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(app, "/api/v1/messages", Some(disabled)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_deleted_account_is_unauthorized() {
        let token = generate_access_token(
            Uuid::new_v4(),
            UserRole::Candidate,
            Some(Uuid::new_v4()),
            SECRET,
            5,
        )
        .unwrap();
        assert_eq!(
            get("/api/v1/invitations/mine", Some(format!("Bearer {token}"))).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        assert_eq!(get("/api/v1/nowhere", None).await, StatusCode::NOT_FOUND);
    }
}
