//! Voice channel join/leave/state and the signaling proxy (§4.11, §6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::handlers::authz::require_channel_capability;
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{ChannelType, VoiceSession, WsEvent};
use crate::permissions::Capability;
use crate::state::AppState;

async fn assert_voice_channel(state: &AppState, channel_id: &str, user_id: &str) -> AppResult<String> {
    let channel = state
        .store
        .find_channel(channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".into()))?;
    if channel.channel_type != ChannelType::Voice {
        return Err(AppError::BadRequest("channel is not a voice channel".into()));
    }
    require_channel_capability(state, &channel.server_id, channel_id, user_id, Capability::ReadMessages).await?;
    Ok(channel.server_id)
}

async fn broadcast_session(state: &AppState, channel_id: &str, server_id: &str, session: VoiceSession) -> AppResult<()> {
    let mut recipients = state
        .store
        .list_members(server_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect::<Vec<_>>();
    let participants = state.voice.participants(channel_id).await;
    for participant in &participants {
        if !recipients.contains(&participant.user_id) {
            recipients.push(participant.user_id.clone());
        }
    }
    state.hub.publish_to_users(&recipients, &WsEvent::VoiceSessionUpdated(session));
    Ok(())
}

pub async fn join(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<Json<VoiceSession>> {
    let server_id = assert_voice_channel(&state, &channel_id, &current.user_id).await?;
    let session = VoiceSession {
        channel_id: channel_id.clone(),
        user_id: current.user_id,
        server_id: Some(server_id.clone()),
        muted: false,
        deafened: false,
        screen_sharing: false,
        joined_at: ids::now(),
    };
    let session = state.voice.join(&channel_id, session).await;
    broadcast_session(&state, &channel_id, &server_id, session.clone()).await?;
    Ok(Json(session))
}

pub async fn leave(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<StatusCode> {
    state.voice.leave(&channel_id, &current.user_id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct VoiceStateUpdate {
    pub muted: Option<bool>,
    pub deafened: Option<bool>,
    #[serde(rename = "screenSharing")]
    pub screen_sharing: Option<bool>,
}

pub async fn update_state(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<VoiceStateUpdate>,
) -> AppResult<Json<VoiceSession>> {
    let server_id = assert_voice_channel(&state, &channel_id, &current.user_id).await?;
    let session = state
        .voice
        .update_state(&channel_id, &current.user_id, body.muted, body.deafened, body.screen_sharing)
        .await
        .ok_or_else(|| AppError::NotFound("not in this voice channel".into()))?;
    broadcast_session(&state, &channel_id, &server_id, session.clone()).await?;
    Ok(Json(session))
}

pub async fn participants(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<Json<Vec<VoiceSession>>> {
    Ok(Json(state.voice.participants(&channel_id).await))
}

pub async fn signal(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    assert_voice_channel(&state, &channel_id, &current.user_id).await?;
    let response = state.voice.forward_signal(&channel_id, &current.user_id, body).await?;
    Ok(Json(response))
}
