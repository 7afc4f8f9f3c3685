//! Presence endpoints (§6) — thin HTTP front over [`crate::presence::PresenceManager`].

use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppResult;
use crate::handlers::extract::CurrentUser;
use crate::models::{BulkPresenceRequest, PresenceState, PutPresenceRequest};
use crate::models::{FriendRequestStatus, WsEvent};
use crate::state::AppState;

pub async fn put(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<PutPresenceRequest>,
) -> AppResult<Json<PresenceState>> {
    let presence = state.presence.set_status(&current.user_id, body.status);

    let requests = state.store.list_friends(&current.user_id).await?;
    let friends: Vec<String> = requests
        .into_iter()
        .filter(|r| r.status == FriendRequestStatus::Accepted)
        .map(|r| {
            if r.from_user_id == current.user_id {
                r.to_user_id
            } else {
                r.from_user_id
            }
        })
        .collect();
    state.hub.publish_to_users(&friends, &WsEvent::PresenceUpdated(presence.clone()));

    Ok(Json(presence))
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<PresenceState>> {
    Ok(Json(PresenceState {
        user_id: current.user_id.clone(),
        status: state.presence.get_status(&current.user_id),
        last_seen_at: crate::ids::now(),
    }))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<PresenceState>> {
    Ok(Json(PresenceState {
        user_id: user_id.clone(),
        status: state.presence.get_status(&user_id),
        last_seen_at: crate::ids::now(),
    }))
}

pub async fn bulk(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(body): Json<BulkPresenceRequest>,
) -> AppResult<Json<Vec<PresenceState>>> {
    Ok(Json(state.presence.bulk_status(&body.user_ids)))
}
