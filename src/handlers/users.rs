//! `GET /v1/me`, `/v1/users/search`, `/v1/users/:id` (§6).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::extract::CurrentUser;
use crate::models::UserPublic;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<UserPublic>> {
    let user = state
        .store
        .find_user_by_id(&current.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(UserPublic::from(user)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<UserPublic>>> {
    let q = query.q.unwrap_or_default().trim().to_string();
    if q.chars().count() < 2 {
        return Ok(Json(vec![]));
    }

    let users = state.store.search_users(&q, 20).await?;
    Ok(Json(
        users
            .into_iter()
            .filter(|u| u.id != current.user_id)
            .map(UserPublic::from)
            .collect(),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserPublic>> {
    let user = state
        .store
        .find_user_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(UserPublic::from(user)))
}
