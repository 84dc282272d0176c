use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::policy::ProfileAccess;
use crate::access::{authorize, Action, Resource};
use crate::audit::{self, AuditEntry};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::messages::service::{
    conversations, page_limit, send_message, thread, Conversation, SendMessageRequest,
};
use crate::models::message::Message;
use crate::models::user::User;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

/// POST /api/v1/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    auth.load(&state.db).await?;
    let recipient: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(req.recipient_id)
        .fetch_optional(&state.db)
        .await?;
    let recipient = recipient
        .filter(|u| u.user_active)
        .ok_or_else(|| AppError::NotFound("Recipient not found".into()))?;
    authorize(
        &auth.actor(),
        Resource::Profile(&ProfileAccess::from(&recipient)),
        Action::Message,
    )
    .require()?;

    let message = send_message(&state.db, auth.user_id, &req).await?;
    audit::record(
        &state.db,
        AuditEntry::new("message_sent", "message")
            .by(auth.user_id, auth.organization_id)
            .resource(message.id)
            .details(json!({
                "recipient_id": recipient.id,
                "message_type": message.message_type,
            })),
    )
    .await;
    Ok(ApiResponse::created(MessageResponse { message }))
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
    pub unread_total: i64,
}

/// GET /api/v1/messages
pub async fn handle_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<ConversationsResponse>>, AppError> {
    let conversations = conversations(&state.db, auth.user_id, page_limit(page.limit)).await?;
    let unread_total = conversations.iter().map(|c| c.unread_count).sum();
    Ok(ApiResponse::ok(ConversationsResponse {
        conversations,
        unread_total,
    }))
}

#[derive(Serialize)]
pub struct ThreadResponse {
    pub partner_id: Uuid,
    pub messages: Vec<Message>,
}

/// GET /api/v1/messages/:partner_id
pub async fn handle_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(partner_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<ThreadResponse>>, AppError> {
    let messages = thread(&state.db, auth.user_id, partner_id, page_limit(page.limit)).await?;
    Ok(ApiResponse::ok(ThreadResponse {
        partner_id,
        messages,
    }))
}
