//! Data model (§3) — entities, their public DTOs, and realtime event envelopes.
//!
//! Field layout mirrors the teacher's `models.rs` (plain structs, `Serialize`
//! + `Deserialize` + `Clone`, a `*Public`/request-DTO split for entities
//! exposed over HTTP) generalized from the teacher's single-server chat model
//! to this spec's servers/channels/direct-threads model.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::Capability;

// ─── Users ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar_hash: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_hash: Option<String>,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            avatar_hash: u.avatar_hash,
        }
    }
}

/// Placeholder shown for a message's author after the user has been deleted (§3).
pub fn unknown_user(id: &str) -> UserPublic {
    UserPublic {
        id: id.to_string(),
        username: "unknown".to_string(),
        display_name: "Unknown user".to_string(),
        avatar_hash: None,
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

// ─── Sessions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// ─── Servers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// True for the hidden backing server of a direct thread (§9).
    #[serde(default)]
    pub is_direct_thread_backing: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
}

// ─── Members ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub server_id: String,
    pub user_id: String,
    pub role_ids: HashSet<String>,
    pub joined_at: DateTime<Utc>,
}

// ─── Roles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub server_id: String,
    pub name: String,
    pub permissions: HashSet<Capability>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: HashSet<Capability>,
}

// ─── Channels ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Text,
    Voice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub server_id: String,
    pub name: String,
    pub channel_type: ChannelType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub channel_type: ChannelType,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
}

// ─── Overwrites ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteTarget {
    Role,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overwrite {
    pub id: String,
    pub channel_id: String,
    pub target: OverwriteTarget,
    pub target_id: String,
    pub allow: HashSet<Capability>,
    pub deny: HashSet<Capability>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OverwriteUpsert {
    pub target: OverwriteTarget,
    pub target_id: String,
    #[serde(default)]
    pub allow: HashSet<Capability>,
    #[serde(default)]
    pub deny: HashSet<Capability>,
}

// ─── Attachments ────────────────────────────────────────────────────────────

pub const MAX_ATTACHMENTS: usize = 10;
pub const MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentInput {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: String,
}

// ─── Messages ───────────────────────────────────────────────────────────────

pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub conversation_id: String,
    pub direct_thread_id: Option<String>,
    pub author_id: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub body: String,
}

// ─── Reactions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
}

// ─── Direct threads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectThreadKind {
    Dm,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectThread {
    pub id: String,
    #[serde(skip_serializing)]
    pub channel_id: String,
    pub kind: DirectThreadKind,
    pub owner_id: String,
    pub title: Option<String>,
    pub participant_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectThreadRequest {
    pub participant_ids: Vec<String>,
    pub title: Option<String>,
}

// ─── Read markers ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadMarker {
    pub conversation_id: String,
    pub user_id: String,
    pub last_read_message_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PutReadMarkerRequest {
    pub last_read_message_id: Option<String>,
}

// ─── Typing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub conversation_id: String,
    pub direct_thread_id: Option<String>,
    pub user_id: String,
    pub is_typing: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TypingRequest {
    pub is_typing: Option<bool>,
}

pub const TYPING_TTL_MS: i64 = 6000;

// ─── Presence ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatusKind {
    Online,
    Idle,
    Dnd,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceState {
    pub user_id: String,
    pub status: PresenceStatusKind,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PutPresenceRequest {
    pub status: PresenceStatusKind,
}

#[derive(Debug, Deserialize)]
pub struct BulkPresenceRequest {
    pub user_ids: Vec<String>,
}

// ─── Friends ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFriendRequestRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondFriendRequestRequest {
    pub action: FriendRequestAction,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

// ─── Invites ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub code: String,
    pub server_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<u32>,
    pub uses: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<u32>,
}

// ─── Moderation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationActionType {
    Kick,
    Ban,
    Timeout,
    Unban,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: String,
    pub server_id: String,
    pub actor_id: String,
    pub target_user_id: String,
    pub action_type: ModerationActionType,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationActionRequest {
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub server_id: String,
    pub user_id: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeout {
    pub server_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub server_id: String,
    pub actor_id: String,
    pub target_user_id: String,
    pub action_type: String,
    pub reason: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ─── Push subscriptions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: String,
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePushSubscriptionRequest {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}

// ─── Voice ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSession {
    pub channel_id: String,
    pub user_id: String,
    pub server_id: Option<String>,
    pub muted: bool,
    pub deafened: bool,
    pub screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
}

// ─── Realtime events (§4.7) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsEvent {
    Ready {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Subscribed {
        #[serde(rename = "channelId")]
        channel_id: String,
    },
    Unsubscribed {
        #[serde(rename = "channelId")]
        channel_id: String,
    },
    #[serde(rename = "message.created")]
    MessageCreated(Message),
    #[serde(rename = "message.updated")]
    MessageUpdated(Message),
    #[serde(rename = "message.deleted")]
    MessageDeleted {
        id: String,
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "directThreadId")]
        direct_thread_id: Option<String>,
    },
    #[serde(rename = "reaction.updated")]
    ReactionUpdated {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "directThreadId")]
        direct_thread_id: Option<String>,
        #[serde(rename = "messageId")]
        message_id: String,
        reactions: Vec<ReactionSummary>,
    },
    #[serde(rename = "typing.updated")]
    TypingUpdated(TypingIndicator),
    #[serde(rename = "direct-thread.created")]
    DirectThreadCreated(DirectThread),
    #[serde(rename = "presence.updated")]
    PresenceUpdated(PresenceState),
    #[serde(rename = "voice.session.updated")]
    VoiceSessionUpdated(VoiceSession),
    Pong,
    Error {
        error: String,
    },
}

/// Client → server WebSocket control frames (§4.8).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Subscribe {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Unsubscribe {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Ping,
}
