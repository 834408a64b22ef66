//! WhatsApp-style messaging endpoints
//!
//! The webhook accepts provider-shaped payloads (entries > changes >
//! messages). Contacts are canonicalized through the phone normalizer at
//! this boundary, so the webhook's bare digit strings and the send path's
//! `+91...` numbers land on the same conversation row.

use axum::extract::{Path, Query, State};
use axum::Json;
use corral_common::db::{Conversation, Direction, ExtraFields};
use corral_common::{phone, time};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::store::MessageInput;
use crate::AppState;

/// Provider webhook payload. Only the fields the CRM acts on are typed;
/// everything else is retained in extension maps and ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: Option<WebhookValue>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    pub metadata: Option<WebhookMetadata>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMetadata {
    pub display_phone_number: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<InboundText>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Deserialize)]
pub struct InboundText {
    pub body: Option<String>,
}

/// POST /api/whatsapp/webhook
///
/// Upserts one conversation and appends one message record per inbound
/// message. Always answers `{success: true}`; a payload with no messages
/// is not an error.
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<Value>> {
    let mut recorded = 0usize;

    for entry in &payload.entry {
        for change in &entry.changes {
            let Some(value) = &change.value else { continue };
            let owner = value
                .metadata
                .as_ref()
                .and_then(|m| m.display_phone_number.as_deref())
                .map(phone::normalize);

            for message in &value.messages {
                let Some(from) = message.from.as_deref() else { continue };
                let contact = phone::normalize(from);

                let body = message.text.as_ref().and_then(|t| t.body.as_deref());
                let fallback;
                let text = match body {
                    Some(body) => Some(body),
                    None => {
                        fallback = format!("[{}]", message.kind.as_deref().unwrap_or("message"));
                        Some(fallback.as_str())
                    }
                };

                state
                    .conversations
                    .record_message(MessageInput {
                        contact: &contact,
                        direction: Direction::In,
                        text,
                        media_url: None,
                        media_type: message.kind.as_deref().filter(|k| *k != "text"),
                        owner_mobile: owner.as_deref(),
                        reset_unread: false,
                    })
                    .await?;
                recorded += 1;
            }
        }
    }

    debug!(messages = recorded, "Processed webhook delivery");

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub to: String,
    pub text: String,
}

/// POST /api/whatsapp/send
///
/// Records the outbound message and resets the unread counter; replying
/// counts as having caught up on the thread. Actual provider delivery is a
/// stub in this deployment.
pub async fn send_text(
    State(state): State<AppState>,
    Json(req): Json<SendTextRequest>,
) -> ApiResult<Json<Value>> {
    let contact = phone::normalize(&req.to);

    state
        .conversations
        .record_message(MessageInput {
            contact: &contact,
            direction: Direction::Out,
            text: Some(&req.text),
            media_url: None,
            media_type: None,
            owner_mobile: None,
            reset_unread: true,
        })
        .await?;

    info!(contact = %contact, "Recorded outbound message");

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SendMediaRequest {
    pub to: String,
    pub media_url: String,
    pub media_type: Option<String>,
}

/// POST /api/whatsapp/send_media
pub async fn send_media(
    State(state): State<AppState>,
    Json(req): Json<SendMediaRequest>,
) -> ApiResult<Json<Value>> {
    let contact = phone::normalize(&req.to);

    state
        .conversations
        .record_message(MessageInput {
            contact: &contact,
            direction: Direction::Out,
            text: None,
            media_url: Some(&req.media_url),
            media_type: req.media_type.as_deref(),
            owner_mobile: None,
            reset_unread: true,
        })
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    pub limit: Option<i64>,
}

/// Conversation plus the derived staleness field, computed at read time.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub age_sec: i64,
}

/// GET /api/whatsapp/conversations?limit=
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> ApiResult<Json<Vec<ConversationView>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let now = time::now();

    let views = state
        .conversations
        .list(limit)
        .await?
        .into_iter()
        .map(|conversation| ConversationView {
            age_sec: time::age_sec(conversation.last_message_at, now),
            conversation,
        })
        .collect();

    Ok(Json(views))
}

/// POST /api/whatsapp/conversations/:contact/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(contact): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .conversations
        .mark_read(&phone::normalize(&contact))
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusQuery {
    #[allow(dead_code)]
    pub contact: Option<String>,
}

/// GET /api/whatsapp/session_status?contact=
///
/// Provider 24-hour messaging window check. Stubbed to true until the
/// provider integration is live.
pub async fn session_status(
    Query(_query): Query<SessionStatusQuery>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "within_24h": true })))
}
