//! Persistence contract (C3, §4.2) — one `Store` trait, two backends.
//!
//! Generalizes the teacher's `db.rs` per-entity query-module layout
//! (`pub mod users { ... }`, `pub mod servers { ... }`) into a single async
//! trait so [`memory::MemoryStore`] and [`sql::SqlStore`] are interchangeable
//! behind `AppState`. Ephemeral state that the spec scopes to C8/C12 (presence,
//! typing, the realtime subscription index) is NOT part of this trait — it
//! lives in `hub.rs`/`presence.rs` instead, matching the teacher's split
//! between `db.rs` (durable) and `presence.rs` (in-memory).

pub mod memory;
pub mod sql;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::*;

/// A single page of results, ordered newest-first unless noted otherwise.
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ──────────────────────────────────────────────────────────

    async fn create_user(&self, user: User) -> AppResult<User>;
    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>>;

    // ─── Sessions ───────────────────────────────────────────────────────

    async fn create_session(&self, session: Session) -> AppResult<Session>;
    async fn find_session(&self, token: &str) -> AppResult<Option<Session>>;
    async fn delete_session(&self, token: &str) -> AppResult<()>;

    // ─── Servers & members ──────────────────────────────────────────────

    async fn create_server(&self, server: Server) -> AppResult<Server>;
    async fn find_server(&self, id: &str) -> AppResult<Option<Server>>;
    async fn list_servers_for_user(&self, user_id: &str) -> AppResult<Vec<Server>>;
    async fn delete_server(&self, id: &str) -> AppResult<()>;

    async fn upsert_member(&self, member: Member) -> AppResult<Member>;
    async fn find_member(&self, server_id: &str, user_id: &str) -> AppResult<Option<Member>>;
    async fn list_members(&self, server_id: &str) -> AppResult<Vec<Member>>;
    async fn remove_member(&self, server_id: &str, user_id: &str) -> AppResult<()>;

    // ─── Roles ──────────────────────────────────────────────────────────

    async fn create_role(&self, role: Role) -> AppResult<Role>;
    async fn find_role(&self, server_id: &str, role_id: &str) -> AppResult<Option<Role>>;
    async fn list_roles(&self, server_id: &str) -> AppResult<Vec<Role>>;
    async fn update_role(&self, role: Role) -> AppResult<Role>;
    async fn delete_role(&self, server_id: &str, role_id: &str) -> AppResult<()>;

    // ─── Channels & overwrites ──────────────────────────────────────────

    async fn create_channel(&self, channel: Channel) -> AppResult<Channel>;
    async fn find_channel(&self, id: &str) -> AppResult<Option<Channel>>;
    async fn list_channels(&self, server_id: &str) -> AppResult<Vec<Channel>>;
    async fn update_channel(&self, channel: Channel) -> AppResult<Channel>;
    async fn delete_channel(&self, id: &str) -> AppResult<()>;

    async fn upsert_overwrite(&self, overwrite: Overwrite) -> AppResult<Overwrite>;
    async fn list_overwrites(&self, channel_id: &str) -> AppResult<Vec<Overwrite>>;
    async fn delete_overwrite(&self, channel_id: &str, overwrite_id: &str) -> AppResult<()>;

    /// Case-insensitive substring match over channel names, scoped to `server_id`.
    async fn search_channels(&self, server_id: &str, query: &str, limit: u32) -> AppResult<Vec<Channel>>;

    // ─── Messages & reactions ───────────────────────────────────────────

    async fn create_message(&self, message: Message) -> AppResult<Message>;
    async fn find_message(&self, id: &str) -> AppResult<Option<Message>>;
    async fn list_messages(
        &self,
        conversation_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> AppResult<Page<Message>>;
    async fn update_message(&self, message: Message) -> AppResult<Message>;
    async fn delete_message(&self, id: &str) -> AppResult<()>;
    async fn search_messages(
        &self,
        conversation_id: &str,
        query: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>>;

    /// Set-insert keyed by (messageId, userId, emoji); idempotent. Returns the
    /// message's updated reaction summary and whether this call actually added
    /// a new reaction (`false` when the caller already had it).
    async fn add_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)>;

    /// Set-delete; a no-op if the reaction wasn't present. Returns the
    /// message's updated reaction summary and whether a reaction was removed.
    async fn remove_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)>;

    // ─── Direct threads ─────────────────────────────────────────────────

    async fn create_direct_thread(&self, thread: DirectThread) -> AppResult<DirectThread>;
    async fn find_direct_thread(&self, id: &str) -> AppResult<Option<DirectThread>>;
    async fn find_direct_thread_by_participants(
        &self,
        participant_ids: &[String],
    ) -> AppResult<Option<DirectThread>>;
    async fn list_direct_threads_for_user(&self, user_id: &str) -> AppResult<Vec<DirectThread>>;

    // ─── Read markers ───────────────────────────────────────────────────

    async fn put_read_marker(&self, marker: ReadMarker) -> AppResult<ReadMarker>;
    async fn find_read_marker(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReadMarker>>;

    // ─── Friends ─────────────────────────────────────────────────────────

    async fn create_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest>;
    async fn find_friend_request(&self, id: &str) -> AppResult<Option<FriendRequest>>;
    async fn find_friend_request_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<FriendRequest>>;
    async fn update_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest>;
    async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendRequest>>;

    // ─── Invites ─────────────────────────────────────────────────────────

    async fn create_invite(&self, invite: Invite) -> AppResult<Invite>;
    async fn find_invite(&self, code: &str) -> AppResult<Option<Invite>>;
    async fn increment_invite_uses(&self, code: &str) -> AppResult<Invite>;
    async fn list_invites(&self, server_id: &str) -> AppResult<Vec<Invite>>;
    async fn delete_invite(&self, code: &str) -> AppResult<()>;

    // ─── Moderation ──────────────────────────────────────────────────────

    async fn create_ban(&self, ban: Ban) -> AppResult<Ban>;
    async fn find_ban(&self, server_id: &str, user_id: &str) -> AppResult<Option<Ban>>;
    async fn list_bans(&self, server_id: &str) -> AppResult<Vec<Ban>>;
    async fn delete_ban(&self, server_id: &str, user_id: &str) -> AppResult<()>;

    async fn put_timeout(&self, timeout: Timeout) -> AppResult<Timeout>;
    async fn find_timeout(&self, server_id: &str, user_id: &str) -> AppResult<Option<Timeout>>;

    async fn record_moderation_action(
        &self,
        action: ModerationAction,
    ) -> AppResult<ModerationAction>;
    async fn list_moderation_actions(&self, server_id: &str) -> AppResult<Vec<ModerationAction>>;

    async fn append_audit_log(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry>;
    async fn list_audit_log(&self, server_id: &str, limit: u32) -> AppResult<Vec<AuditLogEntry>>;

    // ─── Push subscriptions ──────────────────────────────────────────────

    async fn upsert_push_subscription(
        &self,
        subscription: PushSubscription,
    ) -> AppResult<PushSubscription>;
    async fn list_push_subscriptions(&self, user_id: &str) -> AppResult<Vec<PushSubscription>>;
    async fn delete_push_subscription(&self, id: &str) -> AppResult<()>;
}
