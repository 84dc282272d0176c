use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AccountStatus;
use crate::config::Config;
use crate::llm_client::ChatCompletion;
use crate::notifications::Notifier;
use crate::organizations::OrganizationStore;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Arc<dyn ObjectStore>,
    /// `LlmClient` when an OpenAI key is configured, `DisabledClient` otherwise.
    pub ai: Arc<dyn ChatCompletion>,
    pub notifier: Arc<dyn Notifier>,
    pub organizations: Arc<dyn OrganizationStore>,
    /// Checked by the `AuthUser` extractor on every authenticated request.
    pub accounts: Arc<dyn AccountStatus>,
    pub config: Config,
}
