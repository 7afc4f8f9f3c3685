//! Permission-loading glue between the store and the [`crate::permissions`]
//! kernel. Handlers call [`capability_for_channel`]/[`capability_for_server`]
//! rather than hand-assembling a `PermissionContext` themselves.

use crate::error::{AppError, AppResult};
use crate::models::{Member, Overwrite, Role, Server};
use crate::permissions::{self, Capability, PermissionContext};
use crate::state::AppState;

/// Loaded permission inputs for one server, reused across several capability checks.
pub struct ServerContext {
    pub server: Server,
    pub member: Member,
    pub roles: Vec<Role>,
    pub is_banned: bool,
    pub is_timed_out: bool,
}

/// Load everything needed to evaluate capabilities for `user_id` in `server_id`.
/// Returns `Forbidden` if the user isn't a member (and isn't the owner) — callers
/// on read paths should translate that into 404 themselves per §7's discretion.
pub async fn load_server_context(
    state: &AppState,
    server_id: &str,
    user_id: &str,
) -> AppResult<ServerContext> {
    let server = state
        .store
        .find_server(server_id)
        .await?
        .ok_or_else(|| AppError::NotFound("server not found".into()))?;

    let member = match state.store.find_member(server_id, user_id).await? {
        Some(m) => m,
        None if user_id == server.owner_id => Member {
            server_id: server_id.to_string(),
            user_id: user_id.to_string(),
            role_ids: Default::default(),
            joined_at: crate::ids::now(),
        },
        None => return Err(AppError::Forbidden),
    };

    let roles = state.store.list_roles(server_id).await?;
    let is_banned = state
        .store
        .find_ban(server_id, user_id)
        .await?
        .is_some();
    let is_timed_out = state
        .store
        .find_timeout(server_id, user_id)
        .await?
        .map(|t| t.expires_at > crate::ids::now())
        .unwrap_or(false);

    Ok(ServerContext {
        server,
        member,
        roles,
        is_banned,
        is_timed_out,
    })
}

pub fn has_capability(
    ctx: &ServerContext,
    overwrites: &[Overwrite],
    include_channel_overwrites: bool,
    capability: Capability,
) -> bool {
    let pctx = PermissionContext {
        server_owner_id: &ctx.server.owner_id,
        user_id: &ctx.member.user_id,
        roles: &ctx.roles,
        member: &ctx.member,
        overwrites,
        is_banned: ctx.is_banned,
        is_timed_out: ctx.is_timed_out,
        include_channel_overwrites,
    };
    permissions::has_permission(&pctx, capability)
}

/// Require `capability` on a channel, loading its overwrites. Returns
/// `Forbidden` naming the capability per §7's "exact capability name" policy.
pub async fn require_channel_capability(
    state: &AppState,
    server_id: &str,
    channel_id: &str,
    user_id: &str,
    capability: Capability,
) -> AppResult<ServerContext> {
    let ctx = load_server_context(state, server_id, user_id).await?;
    if ctx.server.owner_id == user_id {
        return Ok(ctx);
    }
    let overwrites = state.store.list_overwrites(channel_id).await?;
    if !has_capability(&ctx, &overwrites, true, capability) {
        return Err(AppError::MissingCapability(capability));
    }
    Ok(ctx)
}

/// Require `capability` at the server level (no channel overwrites apply).
pub async fn require_server_capability(
    state: &AppState,
    server_id: &str,
    user_id: &str,
    capability: Capability,
) -> AppResult<ServerContext> {
    let ctx = load_server_context(state, server_id, user_id).await?;
    if ctx.server.owner_id == user_id {
        return Ok(ctx);
    }
    if !has_capability(&ctx, &[], false, capability) {
        return Err(AppError::MissingCapability(capability));
    }
    Ok(ctx)
}
