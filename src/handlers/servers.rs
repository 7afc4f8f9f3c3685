//! Servers, members, roles, invites, and moderation (§6, §4.1–4.2).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::handlers::authz::require_server_capability;
use crate::handlers::extract::CurrentUser;
use crate::ids;
use crate::models::{
    AuditLogEntry, Ban, CreateInviteRequest, CreateRoleRequest, CreateServerRequest, Invite,
    Member, ModerationAction, ModerationActionRequest, ModerationActionType, Role, Server,
    Timeout,
};
use crate::permissions::Capability;
use crate::state::AppState;

// ─── Servers ────────────────────────────────────────────────────────────────

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateServerRequest>,
) -> AppResult<(StatusCode, Json<Server>)> {
    let name = body.name.trim().to_string();
    if name.chars().count() < 2 {
        return Err(AppError::BadRequest("server name must be at least 2 characters".into()));
    }

    let server = Server {
        id: ids::generate(ids::prefix::SERVER),
        name,
        owner_id: current.user_id.clone(),
        created_at: ids::now(),
        is_direct_thread_backing: false,
    };
    let server = state.store.create_server(server).await?;

    let everyone = Role {
        id: ids::generate(ids::prefix::ROLE),
        server_id: server.id.clone(),
        name: "@everyone".to_string(),
        permissions: [Capability::ReadMessages, Capability::SendMessages]
            .into_iter()
            .collect(),
        is_default: true,
        created_at: ids::now(),
    };
    state.store.create_role(everyone).await?;

    let owner_role = Role {
        id: ids::generate(ids::prefix::ROLE),
        server_id: server.id.clone(),
        name: "Owner".to_string(),
        permissions: Capability::ALL.into_iter().collect(),
        is_default: false,
        created_at: ids::now(),
    };
    let owner_role = state.store.create_role(owner_role).await?;

    let owner_member = Member {
        server_id: server.id.clone(),
        user_id: current.user_id,
        role_ids: [owner_role.id].into_iter().collect(),
        joined_at: ids::now(),
    };
    state.store.upsert_member(owner_member).await?;

    Ok((StatusCode::CREATED, Json(server)))
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Server>>> {
    let servers = state.store.list_servers_for_user(&current.user_id).await?;
    Ok(Json(
        servers.into_iter().filter(|s| !s.is_direct_thread_backing).collect(),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Server>> {
    let server = state
        .store
        .find_server(&server_id)
        .await?
        .ok_or_else(|| AppError::NotFound("server not found".into()))?;
    Ok(Json(server))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<StatusCode> {
    let server = state
        .store
        .find_server(&server_id)
        .await?
        .ok_or_else(|| AppError::NotFound("server not found".into()))?;
    if server.owner_id != current.user_id {
        return Err(AppError::Forbidden);
    }
    state.store.delete_server(&server_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<StatusCode> {
    let server = state
        .store
        .find_server(&server_id)
        .await?
        .ok_or_else(|| AppError::NotFound("server not found".into()))?;
    if server.owner_id == current.user_id {
        return Err(AppError::Conflict(
            "owners cannot leave their own server; delete it instead".into(),
        ));
    }
    state.store.remove_member(&server_id, &current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Members ────────────────────────────────────────────────────────────────

pub async fn list_members(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<Member>>> {
    if state.store.find_server(&server_id).await?.is_none() {
        return Err(AppError::NotFound("server not found".into()));
    }
    Ok(Json(state.store.list_members(&server_id).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path((server_id, user_id)): Path<(String, String)>,
) -> AppResult<Json<Member>> {
    let member = state
        .store
        .find_member(&server_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("member not found".into()))?;
    Ok(Json(member))
}

pub async fn kick_member(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id)): Path<(String, String)>,
    Json(body): Json<ModerationActionRequest>,
) -> AppResult<StatusCode> {
    let ctx = require_server_capability(&state, &server_id, &current.user_id, Capability::KickMembers).await?;
    if user_id == ctx.server.owner_id {
        return Err(AppError::Forbidden);
    }
    state.store.remove_member(&server_id, &user_id).await?;
    record_moderation(
        &state,
        &server_id,
        &current.user_id,
        &user_id,
        ModerationActionType::Kick,
        body.reason,
        None,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Bans ───────────────────────────────────────────────────────────────────

pub async fn ban_member(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id)): Path<(String, String)>,
    Json(body): Json<ModerationActionRequest>,
) -> AppResult<StatusCode> {
    let ctx = require_server_capability(&state, &server_id, &current.user_id, Capability::BanMembers).await?;
    if user_id == ctx.server.owner_id {
        return Err(AppError::Forbidden);
    }
    state
        .store
        .create_ban(Ban {
            server_id: server_id.clone(),
            user_id: user_id.clone(),
            reason: body.reason.clone(),
            created_at: ids::now(),
        })
        .await?;
    state.store.remove_member(&server_id, &user_id).await?;
    record_moderation(
        &state,
        &server_id,
        &current.user_id,
        &user_id,
        ModerationActionType::Ban,
        body.reason,
        None,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unban_member(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::BanMembers).await?;
    state.store.delete_ban(&server_id, &user_id).await?;
    record_moderation(
        &state,
        &server_id,
        &current.user_id,
        &user_id,
        ModerationActionType::Unban,
        None,
        None,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_bans(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<Ban>>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::BanMembers).await?;
    Ok(Json(state.store.list_bans(&server_id).await?))
}

pub async fn timeout_member(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id)): Path<(String, String)>,
    Json(body): Json<ModerationActionRequest>,
) -> AppResult<StatusCode> {
    let ctx = require_server_capability(&state, &server_id, &current.user_id, Capability::KickMembers).await?;
    if user_id == ctx.server.owner_id {
        return Err(AppError::Forbidden);
    }
    let expires_at = body
        .expires_at
        .ok_or_else(|| AppError::BadRequest("timeout requires expiresAt".into()))?;
    state
        .store
        .put_timeout(Timeout {
            server_id: server_id.clone(),
            user_id: user_id.clone(),
            expires_at,
        })
        .await?;
    record_moderation(
        &state,
        &server_id,
        &current.user_id,
        &user_id,
        ModerationActionType::Timeout,
        body.reason,
        Some(expires_at),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_moderation(
    state: &AppState,
    server_id: &str,
    actor_id: &str,
    target_user_id: &str,
    action_type: ModerationActionType,
    reason: Option<String>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> AppResult<ModerationAction> {
    let action = ModerationAction {
        id: ids::generate(ids::prefix::MODERATION),
        server_id: server_id.to_string(),
        actor_id: actor_id.to_string(),
        target_user_id: target_user_id.to_string(),
        action_type,
        reason: reason.clone(),
        expires_at,
        created_at: ids::now(),
    };
    let action = state.store.record_moderation_action(action).await?;
    state
        .store
        .append_audit_log(AuditLogEntry {
            id: ids::generate(ids::prefix::AUDIT),
            server_id: server_id.to_string(),
            actor_id: actor_id.to_string(),
            target_user_id: target_user_id.to_string(),
            action_type: format!("{:?}", action_type).to_lowercase(),
            reason,
            metadata: serde_json::json!({}),
            created_at: ids::now(),
        })
        .await?;
    Ok(action)
}

pub async fn list_audit_log(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    Ok(Json(state.store.list_audit_log(&server_id, 100).await?))
}

// ─── Roles ──────────────────────────────────────────────────────────────────

pub async fn list_roles(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<Role>>> {
    if state.store.find_server(&server_id).await?.is_none() {
        return Err(AppError::NotFound("server not found".into()));
    }
    Ok(Json(state.store.list_roles(&server_id).await?))
}

pub async fn create_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
    Json(body): Json<CreateRoleRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("role name must not be empty".into()));
    }
    let role = Role {
        id: ids::generate(ids::prefix::ROLE),
        server_id,
        name,
        permissions: body.permissions,
        is_default: false,
        created_at: ids::now(),
    };
    let role = state.store.create_role(role).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<std::collections::HashSet<Capability>>,
}

pub async fn update_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, role_id)): Path<(String, String)>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<Role>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    let mut role = state
        .store
        .find_role(&server_id, &role_id)
        .await?
        .ok_or_else(|| AppError::NotFound("role not found".into()))?;
    if let Some(name) = body.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("role name must not be empty".into()));
        }
        role.name = name;
    }
    if let Some(permissions) = body.permissions {
        role.permissions = permissions;
    }
    let role = state.store.update_role(role).await?;
    Ok(Json(role))
}

pub async fn delete_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, role_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    let role = state
        .store
        .find_role(&server_id, &role_id)
        .await?
        .ok_or_else(|| AppError::NotFound("role not found".into()))?;
    if role.is_default {
        return Err(AppError::Conflict("the default role cannot be deleted".into()));
    }
    state.store.delete_role(&server_id, &role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id, role_id)): Path<(String, String, String)>,
) -> AppResult<Json<Member>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    if state.store.find_role(&server_id, &role_id).await?.is_none() {
        return Err(AppError::NotFound("role not found".into()));
    }
    let mut member = state
        .store
        .find_member(&server_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("member not found".into()))?;
    member.role_ids.insert(role_id);
    let member = state.store.upsert_member(member).await?;
    Ok(Json(member))
}

pub async fn remove_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, user_id, role_id)): Path<(String, String, String)>,
) -> AppResult<Json<Member>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    let mut member = state
        .store
        .find_member(&server_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("member not found".into()))?;
    member.role_ids.remove(&role_id);
    let member = state.store.upsert_member(member).await?;
    Ok(Json(member))
}

// ─── Invites ────────────────────────────────────────────────────────────────

pub async fn create_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
    Json(body): Json<CreateInviteRequest>,
) -> AppResult<(StatusCode, Json<Invite>)> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    let invite = Invite {
        code: ids::generate_invite_code(),
        server_id,
        created_by: current.user_id,
        created_at: ids::now(),
        expires_at: body.expires_at,
        max_uses: body.max_uses,
        uses: 0,
    };
    let invite = state.store.create_invite(invite).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

pub async fn list_invites(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(server_id): Path<String>,
) -> AppResult<Json<Vec<Invite>>> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    Ok(Json(state.store.list_invites(&server_id).await?))
}

pub async fn delete_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((server_id, code)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_server_capability(&state, &server_id, &current.user_id, Capability::ManageServer).await?;
    state.store.delete_invite(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a server by invite code. Per §4.2's invite state machine: validates
/// expiry/usage/ban atomically, no-ops (without incrementing uses) if the
/// caller is already a member, and fails closed (404, to avoid enumeration)
/// on any invalid, expired, maxed-out, or banned-caller invite.
pub async fn join_by_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<Server>> {
    let invite = state
        .store
        .find_invite(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("invite not found".into()))?;

    if let Some(expires_at) = invite.expires_at {
        if expires_at <= ids::now() {
            return Err(AppError::NotFound("invite not found".into()));
        }
    }
    if let Some(max_uses) = invite.max_uses {
        if invite.uses >= max_uses {
            return Err(AppError::NotFound("invite not found".into()));
        }
    }
    if state
        .store
        .find_ban(&invite.server_id, &current.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::NotFound("invite not found".into()));
    }

    let server = state
        .store
        .find_server(&invite.server_id)
        .await?
        .ok_or_else(|| AppError::NotFound("invite not found".into()))?;

    if state
        .store
        .find_member(&invite.server_id, &current.user_id)
        .await?
        .is_some()
    {
        return Ok(Json(server));
    }

    let default_role = state
        .store
        .list_roles(&invite.server_id)
        .await?
        .into_iter()
        .find(|r| r.is_default);

    let member = Member {
        server_id: invite.server_id.clone(),
        user_id: current.user_id,
        role_ids: default_role.map(|r| [r.id].into_iter().collect()).unwrap_or_default(),
        joined_at: ids::now(),
    };
    state.store.upsert_member(member).await?;
    state.store.increment_invite_uses(&code).await?;

    Ok(Json(server))
}

