//! Channels and their permission overwrites (§6, §4.1).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::handlers::authz::{require_channel_capability, require_server_capability};
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{
    Channel, CreateChannelRequest, Overwrite, OverwriteUpsert, TypingIndicator, TypingRequest,
    UpdateChannelRequest, WsEvent,
};
use crate::permissions::Capability;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
    Json(body): Json<CreateChannelRequest>,
) -> AppResult<(StatusCode, Json<Channel>)> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageChannels).await?;
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("channel name must not be empty".into()));
    }
    let channel = Channel {
        id: ids::generate(ids::prefix::CHANNEL),
        server_id,
        name,
        channel_type: body.channel_type,
        created_at: ids::now(),
    };
    let channel = state.store.create_channel(channel).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<Channel>>> {
    if state.store.find_server(&server_id).await?.is_none() {
        return Err(AppError::NotFound("server not found".into()));
    }
    Ok(Json(state.store.list_channels(&server_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<UpdateChannelRequest>,
) -> AppResult<Json<Channel>> {
    let mut channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_server_capability(&state, &channel.server_id, &current.user_id, Capability::ManageChannels).await?;

    if let Some(name) = body.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("channel name must not be empty".into()));
        }
        channel.name = name;
    }
    let channel = state.store.update_channel(channel).await?;
    Ok(Json(channel))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<StatusCode> {
    let channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_server_capability(&state, &channel.server_id, &current.user_id, Capability::ManageChannels).await?;
    state.store.delete_channel(&channel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_overwrites(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<Vec<OverwriteUpsert>>,
) -> AppResult<Json<Vec<Overwrite>>> {
    let channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_server_capability(&state, &channel.server_id, &current.user_id, Capability::ManageChannels).await?;

    let existing = state.store.list_overwrites(&channel_id).await?;
    let mut result = Vec::with_capacity(body.len());
    for upsert in body {
        let id = existing
            .iter()
            .find(|ow| ow.target == upsert.target && ow.target_id == upsert.target_id)
            .map(|ow| ow.id.clone())
            .unwrap_or_else(|| ids::generate(ids::prefix::OVERWRITE));
        let overwrite = Overwrite {
            id,
            channel_id: channel_id.clone(),
            target: upsert.target,
            target_id: upsert.target_id,
            allow: upsert.allow,
            deny: upsert.deny,
            created_at: ids::now(),
        };
        result.push(state.store.upsert_overwrite(overwrite).await?);
    }
    Ok(Json(result))
}

pub async fn typing(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<TypingRequest>,
) -> AppResult<StatusCode> {
    if !state.rate_limiters.typing.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 10 });
    }
    let channel = state
        .store
        .find_channel(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_channel_capability(&state, &channel.server_id, &channel_id, &current.user_id, Capability::SendMessages)
        .await?;

    let is_typing = body.is_typing.unwrap_or(true);
    let indicator = if is_typing {
        state.presence.start_typing(&channel_id, None, &current.user_id)
    } else {
        state.presence.stop_typing(&channel_id, &current.user_id);
        TypingIndicator {
            conversation_id: channel_id.clone(),
            direct_thread_id: None,
            user_id: current.user_id.clone(),
            is_typing: false,
            expires_at: ids::now(),
        }
    };
    state.hub.publish_to_conversation(&channel_id, &WsEvent::TypingUpdated(indicator));
    Ok(StatusCode::NO_CONTENT)
}

/// Confirm the caller can read `channel_id`, used by the WebSocket subscribe
/// path (§4.8) and by the HTTP message list/search endpoints.
pub async fn assert_can_read(state: &AppState, channel_id: &str, user_id: &str) -> AppResult<()> {
    let channel = state
        .store
        .find_channel(channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    require_channel_capability(state, &channel.server_id, channel_id, user_id, Capability::ReadMessages).await?;
    Ok(())
}
