//! Push subscription CRUD (§6). `create` is keyed by (userId, endpoint) —
//! the store's `upsert_push_subscription` does the idempotent refresh.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{CreatePushSubscriptionRequest, PushSubscription};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreatePushSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<PushSubscription>)> {
    let existing = state
        .store
        .list_push_subscriptions(&current.user_id)
        .await?
        .into_iter()
        .find(|s| s.endpoint == body.endpoint);

    let (id, created_at) = match existing {
        Some(s) => (s.id, s.created_at),
        None => (ids::generate(ids::prefix::PUSH_SUBSCRIPTION), ids::now()),
    };
    let subscription = PushSubscription {
        id,
        user_id: current.user_id,
        endpoint: body.endpoint,
        p256dh: body.p256dh,
        auth: body.auth,
        user_agent: body.user_agent,
        created_at,
        updated_at: ids::now(),
    };
    let subscription = state.store.upsert_push_subscription(subscription).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<PushSubscription>>> {
    Ok(Json(state.store.list_push_subscriptions(&current.user_id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subscription_id): Path<String>,
) -> AppResult<StatusCode> {
    let owned = state
        .store
        .list_push_subscriptions(&current.user_id)
        .await?
        .into_iter()
        .any(|s| s.id == subscription_id);
    if !owned {
        return Err(AppError::NotFound("push subscription not found".into()));
    }
    state.store.delete_push_subscription(&subscription_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
