//! Unified search across users, channels, and messages (§4.2, §6).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::authz::{has_capability, load_server_context, ServerContext};
use crate::handlers::extract::CurrentUser;
use crate::models::{Channel, Message, UserPublic};
use crate::permissions::Capability;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    All,
    Messages,
    Users,
    Channels,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: SearchScope,
    #[serde(rename = "serverId")]
    pub server_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_scope() -> SearchScope {
    SearchScope::All
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Default, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserPublic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<Channel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

pub async fn search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let q = query.q.unwrap_or_default().trim().to_string();
    if q.chars().count() < 2 {
        return Ok(Json(SearchResults::default()));
    }
    let limit = query.limit.clamp(1, 100);
    let include_users = matches!(query.scope, SearchScope::All | SearchScope::Users);
    let include_channels = matches!(query.scope, SearchScope::All | SearchScope::Channels);
    let include_messages = matches!(query.scope, SearchScope::All | SearchScope::Messages);

    let mut results = SearchResults::default();

    if include_users {
        let users = state.store.search_users(&q, limit.min(20)).await?;
        results.users = Some(
            users
                .into_iter()
                .filter(|u| u.id != current.user_id)
                .map(UserPublic::from)
                .collect(),
        );
    }

    if let Some(server_id) = &query.server_id {
        let ctx = match load_server_context(&state, server_id, &current.user_id).await {
            Ok(ctx) => Some(ctx),
            Err(_) => None,
        };
        if let Some(ctx) = ctx {
            if include_channels {
                let candidates = state.store.search_channels(server_id, &q, limit.min(100)).await?;
                results.channels = Some(readable_channels(&state, &ctx, candidates).await?);
            }
            if include_messages {
                let channels = state.store.list_channels(server_id).await?;
                let mut messages = vec![];
                for channel in channels {
                    if !channel_is_readable(&state, &ctx, &channel.id).await? {
                        continue;
                    }
                    let found = state.store.search_messages(&channel.id, &q, limit.min(100) as u32).await?;
                    messages.extend(found);
                }
                messages.sort_by(|a, b| b.id.cmp(&a.id));
                messages.truncate(limit.min(100) as usize);
                results.messages = Some(messages);
            }
        }
    }

    Ok(Json(results))
}

async fn channel_is_readable(state: &AppState, ctx: &ServerContext, channel_id: &str) -> AppResult<bool> {
    if ctx.server.owner_id == ctx.member.user_id {
        return Ok(true);
    }
    let overwrites = state.store.list_overwrites(channel_id).await?;
    Ok(has_capability(ctx, &overwrites, true, Capability::ReadMessages))
}

async fn readable_channels(state: &AppState, ctx: &ServerContext, candidates: Vec<Channel>) -> AppResult<Vec<Channel>> {
    let mut out = vec![];
    for channel in candidates {
        if channel_is_readable(state, ctx, &channel.id).await? {
            out.push(channel);
        }
    }
    Ok(out)
}
