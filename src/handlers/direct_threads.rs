//! Direct threads (1:1 and group DMs) and their messages (§4.5, §9).
//!
//! Backed by a hidden server+channel pair (§9's cyclic DirectThread↔Channel
//! design note): a DM's storage and permissioning reuse the same
//! server/channel/role machinery as a community, just never surfaced in
//! `GET /v1/servers`.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{
    Attachment, Channel, ChannelType, CreateDirectThreadRequest, DirectThread, DirectThreadKind,
    EditMessageRequest, Member, Message, PutReadMarkerRequest, ReadMarker, Role, SendMessageRequest,
    Server, TypingIndicator, TypingRequest, WsEvent, MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES,
    MAX_MESSAGE_LENGTH,
};
use crate::notifications;
use crate::permissions::Capability;
use crate::state::AppState;
use crate::store::Page;

fn is_participant(thread: &DirectThread, user_id: &str) -> bool {
    thread.participant_ids.iter().any(|id| id == user_id)
}

async fn load_thread_for_participant(state: &AppState, thread_id: &str, user_id: &str) -> AppResult<DirectThread> {
    let thread = state
        .store
        .find_direct_thread(thread_id)
        .await?
        .ok_or_else(|| AppError::NotFound("direct thread not found".into()))?;
    if !is_participant(&thread, user_id) {
        return Err(AppError::NotFound("direct thread not found".into()));
    }
    Ok(thread)
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateDirectThreadRequest>,
) -> AppResult<(StatusCode, Json<DirectThread>)> {
    let mut participants: Vec<String> = body.participant_ids;
    if !participants.contains(&current.user_id) {
        participants.push(current.user_id.clone());
    }
    let unique: HashSet<&String> = participants.iter().collect();
    if unique.len() != participants.len() {
        participants = unique.into_iter().cloned().collect();
    }
    if participants.len() < 2 {
        return Err(AppError::BadRequest("a direct thread needs at least two participants".into()));
    }
    for participant_id in &participants {
        if state.store.find_user_by_id(participant_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {participant_id} not found")));
        }
    }

    let kind = if participants.len() == 2 {
        DirectThreadKind::Dm
    } else {
        DirectThreadKind::Group
    };

    if kind == DirectThreadKind::Dm {
        if let Some(existing) = state.store.find_direct_thread_by_participants(&participants).await? {
            return Ok((StatusCode::OK, Json(existing)));
        }
    }

    let backing_server = Server {
        id: ids::generate(ids::prefix::SERVER),
        name: body.title.clone().unwrap_or_else(|| "Direct Message".to_string()),
        owner_id: current.user_id.clone(),
        created_at: ids::now(),
        is_direct_thread_backing: true,
    };
    let backing_server = state.store.create_server(backing_server).await?;

    let default_role = Role {
        id: ids::generate(ids::prefix::ROLE),
        server_id: backing_server.id.clone(),
        name: "@everyone".to_string(),
        permissions: [Capability::ReadMessages, Capability::SendMessages]
            .into_iter()
            .collect(),
        is_default: true,
        created_at: ids::now(),
    };
    let default_role = state.store.create_role(default_role).await?;

    for participant_id in &participants {
        state
            .store
            .upsert_member(Member {
                server_id: backing_server.id.clone(),
                user_id: participant_id.clone(),
                role_ids: [default_role.id.clone()].into_iter().collect(),
                joined_at: ids::now(),
            })
            .await?;
    }

    let channel = Channel {
        id: ids::generate(ids::prefix::CHANNEL),
        server_id: backing_server.id.clone(),
        name: "dm".to_string(),
        channel_type: ChannelType::Text,
        created_at: ids::now(),
    };
    let channel = state.store.create_channel(channel).await?;

    let thread = DirectThread {
        id: ids::generate(ids::prefix::THREAD),
        channel_id: channel.id,
        kind,
        owner_id: current.user_id,
        title: body.title,
        participant_ids: participants.clone(),
        created_at: ids::now(),
        updated_at: ids::now(),
    };
    let thread = state.store.create_direct_thread(thread).await?;

    state
        .hub
        .publish_to_users(&participants, &WsEvent::DirectThreadCreated(thread.clone()));

    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<DirectThread>>> {
    Ok(Json(state.store.list_direct_threads_for_user(&current.user_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
) -> AppResult<Json<DirectThread>> {
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;
    Ok(Json(thread))
}

/// Remove the caller from a direct thread (§4.5's "Leave"). Once the last
/// participant leaves, the backing server is torn down, cascading the
/// channel, messages, reactions, and read markers with it.
pub async fn leave(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
) -> AppResult<StatusCode> {
    let mut thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;
    thread.participant_ids.retain(|id| id != &current.user_id);
    thread.updated_at = ids::now();

    let backing_server_id = {
        let channel = state
            .store
            .find_channel(&thread.channel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("direct thread not found".into()))?;
        channel.server_id
    };
    state.store.remove_member(&backing_server_id, &current.user_id).await?;

    if thread.participant_ids.is_empty() {
        state.store.delete_channel(&thread.channel_id).await?;
        state.store.delete_server(&backing_server_id).await?;
    } else {
        state.store.create_direct_thread(thread).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    if !state.rate_limiters.messages.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;

    let body_text = body.body.trim().to_string();
    if body_text.is_empty() || body_text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "message body must be non-empty and at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    if body.attachments.len() > MAX_ATTACHMENTS {
        return Err(AppError::BadRequest(format!(
            "a message may carry at most {MAX_ATTACHMENTS} attachments"
        )));
    }
    let mut attachments = Vec::with_capacity(body.attachments.len());
    for input in body.attachments {
        if input.file_name.trim().is_empty() || input.content_type.trim().is_empty() || input.url.trim().is_empty() {
            return Err(AppError::BadRequest("attachment fields must not be empty".into()));
        }
        if input.size_bytes == 0 || input.size_bytes > MAX_ATTACHMENT_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "attachment size must be between 1 byte and {MAX_ATTACHMENT_BYTES} bytes"
            )));
        }
        attachments.push(Attachment {
            id: ids::generate(ids::prefix::ATTACHMENT),
            file_name: input.file_name,
            content_type: input.content_type,
            size_bytes: input.size_bytes,
            url: input.url,
            uploaded_by: current.user_id.clone(),
            created_at: ids::now(),
        });
    }

    let message = Message {
        id: ids::generate(ids::prefix::MESSAGE),
        channel_id: thread.channel_id.clone(),
        conversation_id: thread.id.clone(),
        direct_thread_id: Some(thread.id.clone()),
        author_id: current.user_id.clone(),
        body: body_text,
        attachments,
        created_at: ids::now(),
        updated_at: None,
        reactions: vec![],
    };
    let message = state.store.create_message(message).await?;

    let mut bumped = thread.clone();
    bumped.updated_at = ids::now();
    state.store.create_direct_thread(bumped).await?;

    state
        .hub
        .publish(&thread.id, &WsEvent::MessageCreated(message.clone()), &thread.participant_ids);

    let notifications = notifications::for_direct_message(&message, &thread);
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

pub async fn list_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> AppResult<Json<Page<Message>>> {
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;
    let limit = query.limit.clamp(1, 100);
    let page = state
        .store
        .list_messages(&thread.id, query.before.as_deref(), limit)
        .await?;
    Ok(Json(page))
}

pub async fn get_read_marker(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
) -> AppResult<Json<ReadMarker>> {
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;
    let marker = state
        .store
        .find_read_marker(&thread.id, &current.user_id)
        .await?
        .unwrap_or_else(|| ReadMarker {
            conversation_id: thread.id.clone(),
            user_id: current.user_id.clone(),
            last_read_message_id: None,
            updated_at: ids::now(),
        });
    Ok(Json(marker))
}

pub async fn put_read_marker(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
    Json(body): Json<PutReadMarkerRequest>,
) -> AppResult<Json<ReadMarker>> {
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;
    if let Some(message_id) = &body.last_read_message_id {
        let message = state
            .store
            .find_message(message_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("lastReadMessageId does not exist".into()))?;
        if message.conversation_id != thread.id {
            return Err(AppError::BadRequest(
                "lastReadMessageId does not belong to this conversation".into(),
            ));
        }
    }
    let marker = ReadMarker {
        conversation_id: thread.id,
        user_id: current.user_id,
        last_read_message_id: body.last_read_message_id,
        updated_at: ids::now(),
    };
    let marker = state.store.put_read_marker(marker).await?;
    Ok(Json(marker))
}

pub async fn typing(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(thread_id): Path<String>,
    Json(body): Json<TypingRequest>,
) -> AppResult<StatusCode> {
    if !state.rate_limiters.typing.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }
    let thread = load_thread_for_participant(&state, &thread_id, &current.user_id).await?;

    let is_typing = body.is_typing.unwrap_or(true);
    let indicator = if is_typing {
        state.presence.start_typing(&thread.id, Some(&thread.id), &current.user_id)
    } else {
        state.presence.stop_typing(&thread.id, &current.user_id);
        TypingIndicator {
            conversation_id: thread.id.clone(),
            direct_thread_id: Some(thread.id.clone()),
            user_id: current.user_id.clone(),
            is_typing: false,
            expires_at: ids::now(),
        }
    };
    state
        .hub
        .publish(&thread.id, &WsEvent::TypingUpdated(indicator), &thread.participant_ids);
    Ok(StatusCode::NO_CONTENT)
}
