//! Friends and friend requests (§6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{
    CreateFriendRequestRequest, FriendRequest, FriendRequestAction, FriendRequestStatus,
    RespondFriendRequestRequest, UserPublic,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FriendView {
    #[serde(flatten)]
    pub user: UserPublic,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<UserPublic>>> {
    let requests = state.store.list_friends(&current.user_id).await?;
    let mut friends = vec![];
    for r in requests {
        if r.status != FriendRequestStatus::Accepted {
            continue;
        }
        let other = if r.from_user_id == current.user_id {
            &r.to_user_id
        } else {
            &r.from_user_id
        };
        if let Some(user) = state.store.find_user_by_id(other).await? {
            friends.push(UserPublic::from(user));
        }
    }
    Ok(Json(friends))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(friend_id): Path<String>,
) -> AppResult<StatusCode> {
    let request = state
        .store
        .find_friend_request_between(&current.user_id, &friend_id)
        .await?
        .filter(|r| r.status == FriendRequestStatus::Accepted)
        .ok_or_else(|| AppError::NotFound("friend not found".into()))?;

    let mut updated = request;
    updated.status = FriendRequestStatus::Rejected;
    updated.updated_at = ids::now();
    state.store.update_friend_request(updated).await?;
    Ok(StatusCode::OK)
}

pub async fn list_requests(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<FriendRequest>>> {
    let requests = state.store.list_friends(&current.user_id).await?;
    Ok(Json(
        requests
            .into_iter()
            .filter(|r| r.status == FriendRequestStatus::Pending)
            .collect(),
    ))
}

pub async fn create_request(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateFriendRequestRequest>,
) -> AppResult<(StatusCode, Json<FriendRequest>)> {
    if body.user_id == current.user_id {
        return Err(AppError::BadRequest("cannot friend yourself".into()));
    }
    if state.store.find_user_by_id(&body.user_id).await?.is_none() {
        return Err(AppError::NotFound("user not found".into()));
    }
    if !state.rate_limiters.friend_requests.check(&current.user_id) {
        return Err(AppError::RateLimited { retry_after_secs: 60 });
    }

    if let Some(existing) = state
        .store
        .find_friend_request_between(&current.user_id, &body.user_id)
        .await?
    {
        return match existing.status {
            FriendRequestStatus::Accepted => {
                Err(AppError::Conflict("already friends".into()))
            }
            FriendRequestStatus::Pending => {
                Err(AppError::Conflict("friend request already pending".into()))
            }
            FriendRequestStatus::Rejected => {
                let mut updated = existing;
                updated.status = FriendRequestStatus::Pending;
                updated.from_user_id = current.user_id.clone();
                updated.to_user_id = body.user_id.clone();
                updated.updated_at = ids::now();
                let updated = state.store.update_friend_request(updated).await?;
                Ok((StatusCode::CREATED, Json(updated)))
            }
        };
    }

    let request = FriendRequest {
        id: ids::generate(ids::prefix::FRIEND_REQUEST),
        from_user_id: current.user_id,
        to_user_id: body.user_id,
        status: FriendRequestStatus::Pending,
        created_at: ids::now(),
        updated_at: ids::now(),
    };
    let request = state.store.create_friend_request(request).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn respond_request(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(request_id): Path<String>,
    Json(body): Json<RespondFriendRequestRequest>,
) -> AppResult<Json<FriendRequest>> {
    let mut request = state
        .store
        .find_friend_request(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("friend request not found".into()))?;

    if request.to_user_id != current.user_id {
        return Err(AppError::Forbidden);
    }
    if request.status != FriendRequestStatus::Pending {
        return Err(AppError::Conflict("friend request already resolved".into()));
    }

    request.status = match body.action {
        FriendRequestAction::Accept => FriendRequestStatus::Accepted,
        FriendRequestAction::Reject => FriendRequestStatus::Rejected,
    };
    request.updated_at = ids::now();
    let request = state.store.update_friend_request(request).await?;
    Ok(Json(request))
}
