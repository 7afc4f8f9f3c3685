//! Messages and reactions on server channels (§4.4, §6).
//!
//! `conversationId` is the unifying address used for hub fan-out and read
//! markers: a channel's own id when the message lives in a server channel,
//! or the owning direct thread's id otherwise (§9).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::authz::require_channel_capability;
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{
    Attachment, EditMessageRequest, Message, SendMessageRequest, MAX_ATTACHMENTS,
    MAX_ATTACHMENT_BYTES, MAX_MESSAGE_LENGTH,
};
use crate::notifications;
use crate::permissions::Capability;
use crate::state::AppState;
use crate::store::Page;

fn normalize_attachments(inputs: Vec<crate::models::AttachmentInput>, uploader: &str) -> AppResult<Vec<Attachment>> {
    if inputs.len() > MAX_ATTACHMENTS {
        return Err(AppError::BadRequest(format!(
            "a message may carry at most {MAX_ATTACHMENTS} attachments"
        )));
    }
    inputs
        .into_iter()
        .map(|input| {
            if input.file_name.trim().is_empty()
                || input.content_type.trim().is_empty()
                || input.url.trim().is_empty()
            {
                return Err(AppError::BadRequest("attachment fields must not be empty".into()));
            }
            if input.size_bytes == 0 || input.size_bytes > MAX_ATTACHMENT_BYTES {
                return Err(AppError::PayloadTooLarge(format!(
                    "attachment size must be between 1 byte and {MAX_ATTACHMENT_BYTES} bytes"
                )));
            }
            Ok(Attachment {
                id: ids::generate(ids::prefix::ATTACHMENT),
                file_name: input.file_name,
                content_type: input.content_type,
                size_bytes: input.size_bytes,
                url: input.url,
                uploaded_by: uploader.to_string(),
                created_at: ids::now(),
            })
        })
        .collect()
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    if !state.rate_limiters.messages.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }

    let channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_channel_capability(&state, &channel.server_id, &channel_id, &current.user_id, Capability::SendMessages)
        .await?;

    let body_text = body.body.trim().to_string();
    if body_text.is_empty() || body_text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "message body must be non-empty and at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    let attachments = normalize_attachments(body.attachments, &current.user_id)?;

    let message = Message {
        id: ids::generate(ids::prefix::MESSAGE),
        channel_id: channel_id.clone(),
        conversation_id: channel_id.clone(),
        direct_thread_id: None,
        author_id: current.user_id.clone(),
        body: body_text,
        attachments,
        created_at: ids::now(),
        updated_at: None,
        reactions: vec![],
    };
    let message = state.store.create_message(message).await?;

    state
        .hub
        .publish_to_conversation(&channel_id, &crate::models::WsEvent::MessageCreated(message.clone()));

    if let Some(server) = state.store.find_server(&channel.server_id).await? {
        let members = state.store.list_members(&channel.server_id).await?;
        let roles = state.store.list_roles(&channel.server_id).await?;
        let overwrites = state.store.list_overwrites(&channel_id).await?;
        let mut readable = vec![];
        for member in &members {
            let ctx = crate::handlers::authz::ServerContext {
                server: server.clone(),
                member: member.clone(),
                roles: roles.clone(),
                is_banned: false,
                is_timed_out: false,
            };
            if member.user_id == server.owner_id
                || crate::handlers::authz::has_capability(&ctx, &overwrites, true, Capability::ReadMessages)
            {
                readable.push(member.user_id.clone());
            }
        }
        let notifications = notifications::for_channel_message(&message, &channel, &server.name, &readable);
        let mut subscriptions = std::collections::HashMap::new();
        for notification in &notifications {
            if !subscriptions.contains_key(&notification.recipient_id) {
                let subs = state.store.list_push_subscriptions(&notification.recipient_id).await?;
                subscriptions.insert(notification.recipient_id.clone(), subs);
            }
        }
        notifications::enqueue(notifications, |user_id| {
            subscriptions.get(user_id).cloned().unwrap_or_default()
        })
        .await;
    }

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> AppResult<Json<Page<Message>>> {
    let channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_channel_capability(&state, &channel.server_id, &channel_id, &current.user_id, Capability::ReadMessages)
        .await?;

    let limit = query.limit.clamp(1, 100);
    let page = state
        .store
        .list_messages(&channel_id, query.before.as_deref(), limit)
        .await?;
    Ok(Json(page))
}

async fn load_owned_message(state: &AppState, message_id: &str, user_id: &str) -> AppResult<Message> {
    let message = state
        .store
        .find_message(message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("message not found".into()))?;
    if message.author_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(message)
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> AppResult<Json<Message>> {
    let mut message = load_owned_message(&state, &message_id, &current.user_id).await?;

    let body_text = body.body.trim().to_string();
    if body_text.is_empty() || body_text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "message body must be non-empty and at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    message.body = body_text;
    message.updated_at = Some(ids::now());
    let message = state.store.update_message(message).await?;

    state
        .hub
        .publish_to_conversation(&message.conversation_id, &crate::models::WsEvent::MessageUpdated(message.clone()));
    Ok(Json(message))
}

#[derive(Debug, serde::Serialize)]
pub struct DeletedMessage {
    pub id: String,
    pub channel_id: String,
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(message_id): Path<String>,
) -> AppResult<(StatusCode, Json<DeletedMessage>)> {
    let message = load_owned_message(&state, &message_id, &current.user_id).await?;
    state.store.delete_message(&message_id).await?;

    state.hub.publish_to_conversation(
        &message.conversation_id,
        &crate::models::WsEvent::MessageDeleted {
            id: message.id.clone(),
            channel_id: message.channel_id.clone(),
            conversation_id: message.conversation_id.clone(),
            direct_thread_id: message.direct_thread_id,
        },
    );
    Ok((
        StatusCode::OK,
        Json(DeletedMessage { id: message.id, channel_id: message.channel_id }),
    ))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((message_id, emoji)): Path<(String, String)>,
) -> AppResult<Json<Vec<crate::models::ReactionSummary>>> {
    if !state.rate_limiters.reactions.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }
    let message = state
        .store
        .find_message(&message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("message not found".into()))?;

    let (reactions, changed) = state
        .store
        .add_reaction(&message_id, &current.user_id, &emoji)
        .await?;

    if changed {
        publish_reaction_update(&state, &message, &reactions);
    }
    Ok(Json(reactions))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((message_id, emoji)): Path<(String, String)>,
) -> AppResult<Json<Vec<crate::models::ReactionSummary>>> {
    if !state.rate_limiters.reactions.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }
    let message = state
        .store
        .find_message(&message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("message not found".into()))?;

    let (reactions, changed) = state
        .store
        .remove_reaction(&message_id, &current.user_id, &emoji)
        .await?;

    if changed {
        publish_reaction_update(&state, &message, &reactions);
    }
    Ok(Json(reactions))
}

fn publish_reaction_update(state: &AppState, message: &Message, reactions: &[crate::models::ReactionSummary]) {
    state.hub.publish_to_conversation(
        &message.conversation_id,
        &crate::models::WsEvent::ReactionUpdated {
            conversation_id: message.conversation_id.clone(),
            direct_thread_id: message.direct_thread_id.clone(),
            message_id: message.id.clone(),
            reactions: reactions.to_vec(),
        },
    );
}
