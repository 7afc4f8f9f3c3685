//! In-memory reference backend (§4.2, §5) — a single-writer-style lock
//! guarding plain `HashMap`s gives it the same linearizable-per-operation
//! semantics as `SqlStore`, so the two are interchangeable in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::ids;
use crate::models::*;

use super::{Page, Store};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    users_by_email: HashMap<String, String>,
    users_by_username: HashMap<String, String>,
    sessions: HashMap<String, Session>,
    servers: HashMap<String, Server>,
    members: HashMap<(String, String), Member>,
    roles: HashMap<(String, String), Role>,
    channels: HashMap<String, Channel>,
    overwrites: HashMap<(String, String), Overwrite>,
    messages: HashMap<String, Message>,
    reactions: HashMap<(String, String, String), ()>,
    direct_threads: HashMap<String, DirectThread>,
    read_markers: HashMap<(String, String), ReadMarker>,
    friend_requests: HashMap<String, FriendRequest>,
    invites: HashMap<String, Invite>,
    bans: HashMap<(String, String), Ban>,
    timeouts: HashMap<(String, String), Timeout>,
    moderation_actions: HashMap<String, ModerationAction>,
    audit_log: HashMap<String, AuditLogEntry>,
    push_subscriptions: HashMap<String, PushSubscription>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(what.to_string())
}

fn summarize_reactions(t: &Tables, message_id: &str) -> Vec<ReactionSummary> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (mid, _, emoji) in t.reactions.keys() {
        if mid == message_id {
            *counts.entry(emoji.clone()).or_default() += 1;
        }
    }
    let mut summary: Vec<ReactionSummary> = counts
        .into_iter()
        .map(|(emoji, count)| ReactionSummary { emoji, count })
        .collect();
    summary.sort_by(|a, b| a.emoji.cmp(&b.emoji));
    summary
}

/// Tears down a channel's own dependents: its messages (and their reactions),
/// overwrites, read markers, and — if the channel backs a direct thread —
/// the thread row along with read markers keyed by the thread's own id
/// (§3, §4.5).
fn cascade_channel(t: &mut Tables, channel_id: &str) {
    let message_ids: Vec<String> = t
        .messages
        .values()
        .filter(|m| m.channel_id == channel_id)
        .map(|m| m.id.clone())
        .collect();
    for message_id in &message_ids {
        t.messages.remove(message_id);
    }
    t.reactions.retain(|(message_id, _, _), _| !message_ids.contains(message_id));
    t.overwrites.retain(|(cid, _), _| cid != channel_id);
    t.read_markers.retain(|(cid, _), _| cid != channel_id);

    let thread_ids: Vec<String> = t
        .direct_threads
        .values()
        .filter(|th| th.channel_id == channel_id)
        .map(|th| th.id.clone())
        .collect();
    for thread_id in &thread_ids {
        t.read_markers.retain(|(cid, _), _| cid != thread_id);
        t.direct_threads.remove(thread_id);
    }
    t.channels.remove(channel_id);
}

/// Cascades a server delete through every descendant (§3, §4.2): each of its
/// channels (which tears down their messages/overwrites/markers/thread in
/// turn), then members, roles, invites, bans, timeouts, moderation actions,
/// and audit log entries.
fn cascade_server(t: &mut Tables, server_id: &str) {
    let channel_ids: Vec<String> = t
        .channels
        .values()
        .filter(|c| c.server_id == server_id)
        .map(|c| c.id.clone())
        .collect();
    for channel_id in &channel_ids {
        cascade_channel(t, channel_id);
    }
    t.members.retain(|(sid, _), _| sid != server_id);
    t.roles.retain(|(sid, _), _| sid != server_id);
    t.invites.retain(|_, i| i.server_id != server_id);
    t.bans.retain(|(sid, _), _| sid != server_id);
    t.timeouts.retain(|(sid, _), _| sid != server_id);
    t.moderation_actions.retain(|_, a| a.server_id != server_id);
    t.audit_log.retain(|_, e| e.server_id != server_id);
    t.servers.remove(server_id);
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut t = self.tables.lock().unwrap();
        if t.users_by_email.contains_key(&user.email.to_lowercase()) {
            return Err(AppError::Conflict("email already registered".into()));
        }
        if t.users_by_username
            .contains_key(&user.username.to_lowercase())
        {
            return Err(AppError::Conflict("username already taken".into()));
        }
        t.users_by_email
            .insert(user.email.to_lowercase(), user.id.clone());
        t.users_by_username
            .insert(user.username.to_lowercase(), user.id.clone());
        t.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users_by_email
            .get(&email.to_lowercase())
            .and_then(|id| t.users.get(id))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users_by_username
            .get(&username.to_lowercase())
            .and_then(|id| t.users.get(id))
            .cloned())
    }

    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>> {
        let needle = query.to_lowercase();
        let t = self.tables.lock().unwrap();
        let mut matching: Vec<User> = t
            .users
            .values()
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.display_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.username.cmp(&b.username));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn create_session(&self, session: Session) -> AppResult<Session> {
        let mut t = self.tables.lock().unwrap();
        t.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self.tables.lock().unwrap().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        self.tables.lock().unwrap().sessions.remove(token);
        Ok(())
    }

    async fn create_server(&self, server: Server) -> AppResult<Server> {
        let mut t = self.tables.lock().unwrap();
        t.servers.insert(server.id.clone(), server.clone());
        Ok(server)
    }

    async fn find_server(&self, id: &str) -> AppResult<Option<Server>> {
        Ok(self.tables.lock().unwrap().servers.get(id).cloned())
    }

    async fn list_servers_for_user(&self, user_id: &str) -> AppResult<Vec<Server>> {
        let t = self.tables.lock().unwrap();
        let mut out: Vec<Server> = t
            .members
            .keys()
            .filter(|(_, u)| u == user_id)
            .filter_map(|(server_id, _)| t.servers.get(server_id).cloned())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn delete_server(&self, id: &str) -> AppResult<()> {
        let mut t = self.tables.lock().unwrap();
        cascade_server(&mut t, id);
        Ok(())
    }

    async fn upsert_member(&self, member: Member) -> AppResult<Member> {
        let mut t = self.tables.lock().unwrap();
        let key = (member.server_id.clone(), member.user_id.clone());
        t.members.insert(key, member.clone());
        Ok(member)
    }

    async fn find_member(&self, server_id: &str, user_id: &str) -> AppResult<Option<Member>> {
        let key = (server_id.to_string(), user_id.to_string());
        Ok(self.tables.lock().unwrap().members.get(&key).cloned())
    }

    async fn list_members(&self, server_id: &str) -> AppResult<Vec<Member>> {
        let t = self.tables.lock().unwrap();
        Ok(t.members
            .values()
            .filter(|m| m.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn remove_member(&self, server_id: &str, user_id: &str) -> AppResult<()> {
        let key = (server_id.to_string(), user_id.to_string());
        self.tables.lock().unwrap().members.remove(&key);
        Ok(())
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut t = self.tables.lock().unwrap();
        let key = (role.server_id.clone(), role.id.clone());
        t.roles.insert(key, role.clone());
        Ok(role)
    }

    async fn find_role(&self, server_id: &str, role_id: &str) -> AppResult<Option<Role>> {
        let key = (server_id.to_string(), role_id.to_string());
        Ok(self.tables.lock().unwrap().roles.get(&key).cloned())
    }

    async fn list_roles(&self, server_id: &str) -> AppResult<Vec<Role>> {
        let t = self.tables.lock().unwrap();
        Ok(t.roles
            .values()
            .filter(|r| r.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn update_role(&self, role: Role) -> AppResult<Role> {
        let mut t = self.tables.lock().unwrap();
        let key = (role.server_id.clone(), role.id.clone());
        if !t.roles.contains_key(&key) {
            return Err(not_found("role"));
        }
        t.roles.insert(key, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, server_id: &str, role_id: &str) -> AppResult<()> {
        let key = (server_id.to_string(), role_id.to_string());
        self.tables.lock().unwrap().roles.remove(&key);
        Ok(())
    }

    async fn create_channel(&self, channel: Channel) -> AppResult<Channel> {
        let mut t = self.tables.lock().unwrap();
        t.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel)
    }

    async fn find_channel(&self, id: &str) -> AppResult<Option<Channel>> {
        Ok(self.tables.lock().unwrap().channels.get(id).cloned())
    }

    async fn list_channels(&self, server_id: &str) -> AppResult<Vec<Channel>> {
        let t = self.tables.lock().unwrap();
        Ok(t.channels
            .values()
            .filter(|c| c.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn update_channel(&self, channel: Channel) -> AppResult<Channel> {
        let mut t = self.tables.lock().unwrap();
        if !t.channels.contains_key(&channel.id) {
            return Err(not_found("channel"));
        }
        t.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel)
    }

    async fn delete_channel(&self, id: &str) -> AppResult<()> {
        let mut t = self.tables.lock().unwrap();
        cascade_channel(&mut t, id);
        Ok(())
    }

    async fn upsert_overwrite(&self, overwrite: Overwrite) -> AppResult<Overwrite> {
        let mut t = self.tables.lock().unwrap();
        let key = (overwrite.channel_id.clone(), overwrite.target_id.clone());
        t.overwrites.insert(key, overwrite.clone());
        Ok(overwrite)
    }

    async fn list_overwrites(&self, channel_id: &str) -> AppResult<Vec<Overwrite>> {
        let t = self.tables.lock().unwrap();
        Ok(t.overwrites
            .values()
            .filter(|o| o.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn delete_overwrite(&self, channel_id: &str, overwrite_id: &str) -> AppResult<()> {
        let mut t = self.tables.lock().unwrap();
        let key = t
            .overwrites
            .iter()
            .find(|(_, o)| o.channel_id == channel_id && o.id == overwrite_id)
            .map(|(k, _)| k.clone());
        if let Some(key) = key {
            t.overwrites.remove(&key);
        }
        Ok(())
    }

    async fn search_channels(&self, server_id: &str, query: &str, limit: u32) -> AppResult<Vec<Channel>> {
        let needle = query.to_lowercase();
        let t = self.tables.lock().unwrap();
        let mut matching: Vec<Channel> = t
            .channels
            .values()
            .filter(|c| c.server_id == server_id && c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn create_message(&self, message: Message) -> AppResult<Message> {
        let mut t = self.tables.lock().unwrap();
        t.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: &str) -> AppResult<Option<Message>> {
        Ok(self.tables.lock().unwrap().messages.get(id).cloned())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let t = self.tables.lock().unwrap();
        let mut matching: Vec<Message> = t
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Window from the newest id backward (the `before` cursor walks
        // history from "now"), then flip the page to the ascending-by-id
        // order §4.2 mandates for the returned contract.
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(cursor) = before {
            matching.retain(|m| m.id.as_str() < cursor);
        }
        let has_more = matching.len() > limit as usize;
        matching.truncate(limit as usize);
        matching.reverse();
        Ok(Page {
            items: matching,
            has_more,
        })
    }

    async fn update_message(&self, message: Message) -> AppResult<Message> {
        let mut t = self.tables.lock().unwrap();
        if !t.messages.contains_key(&message.id) {
            return Err(not_found("message"));
        }
        t.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn delete_message(&self, id: &str) -> AppResult<()> {
        self.tables.lock().unwrap().messages.remove(id);
        Ok(())
    }

    async fn search_messages(
        &self,
        conversation_id: &str,
        query: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>> {
        let needle = query.to_lowercase();
        let t = self.tables.lock().unwrap();
        let mut matching: Vec<Message> = t
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id && m.body.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn add_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)> {
        let mut t = self.tables.lock().unwrap();
        let key = (
            message_id.to_string(),
            user_id.to_string(),
            emoji.to_string(),
        );
        let changed = t.reactions.insert(key, ()).is_none();
        let summary = summarize_reactions(&t, message_id);
        if let Some(msg) = t.messages.get_mut(message_id) {
            msg.reactions = summary.clone();
        }
        Ok((summary, changed))
    }

    async fn remove_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)> {
        let mut t = self.tables.lock().unwrap();
        let key = (
            message_id.to_string(),
            user_id.to_string(),
            emoji.to_string(),
        );
        let changed = t.reactions.remove(&key).is_some();
        let summary = summarize_reactions(&t, message_id);
        if let Some(msg) = t.messages.get_mut(message_id) {
            msg.reactions = summary.clone();
        }
        Ok((summary, changed))
    }

    async fn create_direct_thread(&self, thread: DirectThread) -> AppResult<DirectThread> {
        let mut t = self.tables.lock().unwrap();
        t.direct_threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    async fn find_direct_thread(&self, id: &str) -> AppResult<Option<DirectThread>> {
        Ok(self.tables.lock().unwrap().direct_threads.get(id).cloned())
    }

    async fn find_direct_thread_by_participants(
        &self,
        participant_ids: &[String],
    ) -> AppResult<Option<DirectThread>> {
        let mut wanted: Vec<String> = participant_ids.to_vec();
        wanted.sort();
        let t = self.tables.lock().unwrap();
        Ok(t.direct_threads
            .values()
            .find(|th| {
                th.kind == DirectThreadKind::Dm && {
                    let mut have = th.participant_ids.clone();
                    have.sort();
                    have == wanted
                }
            })
            .cloned())
    }

    async fn list_direct_threads_for_user(&self, user_id: &str) -> AppResult<Vec<DirectThread>> {
        let t = self.tables.lock().unwrap();
        let mut out: Vec<DirectThread> = t
            .direct_threads
            .values()
            .filter(|th| th.participant_ids.iter().any(|p| p == user_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn put_read_marker(&self, marker: ReadMarker) -> AppResult<ReadMarker> {
        let mut t = self.tables.lock().unwrap();
        let key = (marker.conversation_id.clone(), marker.user_id.clone());
        t.read_markers.insert(key, marker.clone());
        Ok(marker)
    }

    async fn find_read_marker(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReadMarker>> {
        let key = (conversation_id.to_string(), user_id.to_string());
        Ok(self.tables.lock().unwrap().read_markers.get(&key).cloned())
    }

    async fn create_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        let mut t = self.tables.lock().unwrap();
        t.friend_requests
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn find_friend_request(&self, id: &str) -> AppResult<Option<FriendRequest>> {
        Ok(self.tables.lock().unwrap().friend_requests.get(id).cloned())
    }

    async fn find_friend_request_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<FriendRequest>> {
        let t = self.tables.lock().unwrap();
        Ok(t.friend_requests
            .values()
            .find(|r| {
                (r.from_user_id == a && r.to_user_id == b)
                    || (r.from_user_id == b && r.to_user_id == a)
            })
            .cloned())
    }

    async fn update_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        let mut t = self.tables.lock().unwrap();
        if !t.friend_requests.contains_key(&request.id) {
            return Err(not_found("friend request"));
        }
        t.friend_requests
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let t = self.tables.lock().unwrap();
        Ok(t.friend_requests
            .values()
            .filter(|r| r.from_user_id == user_id || r.to_user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_invite(&self, invite: Invite) -> AppResult<Invite> {
        let mut t = self.tables.lock().unwrap();
        if t.invites.contains_key(&invite.code) {
            return Err(AppError::Conflict("invite code already exists".into()));
        }
        t.invites.insert(invite.code.clone(), invite.clone());
        Ok(invite)
    }

    async fn find_invite(&self, code: &str) -> AppResult<Option<Invite>> {
        Ok(self.tables.lock().unwrap().invites.get(code).cloned())
    }

    async fn increment_invite_uses(&self, code: &str) -> AppResult<Invite> {
        let mut t = self.tables.lock().unwrap();
        let invite = t.invites.get_mut(code).ok_or_else(|| not_found("invite"))?;
        invite.uses += 1;
        Ok(invite.clone())
    }

    async fn list_invites(&self, server_id: &str) -> AppResult<Vec<Invite>> {
        let t = self.tables.lock().unwrap();
        Ok(t.invites
            .values()
            .filter(|i| i.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn delete_invite(&self, code: &str) -> AppResult<()> {
        self.tables.lock().unwrap().invites.remove(code);
        Ok(())
    }

    async fn create_ban(&self, ban: Ban) -> AppResult<Ban> {
        let mut t = self.tables.lock().unwrap();
        let key = (ban.server_id.clone(), ban.user_id.clone());
        t.bans.insert(key, ban.clone());
        Ok(ban)
    }

    async fn find_ban(&self, server_id: &str, user_id: &str) -> AppResult<Option<Ban>> {
        let key = (server_id.to_string(), user_id.to_string());
        Ok(self.tables.lock().unwrap().bans.get(&key).cloned())
    }

    async fn list_bans(&self, server_id: &str) -> AppResult<Vec<Ban>> {
        let t = self.tables.lock().unwrap();
        Ok(t.bans
            .values()
            .filter(|b| b.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn delete_ban(&self, server_id: &str, user_id: &str) -> AppResult<()> {
        let key = (server_id.to_string(), user_id.to_string());
        self.tables.lock().unwrap().bans.remove(&key);
        Ok(())
    }

    async fn put_timeout(&self, timeout: Timeout) -> AppResult<Timeout> {
        let mut t = self.tables.lock().unwrap();
        let key = (timeout.server_id.clone(), timeout.user_id.clone());
        t.timeouts.insert(key, timeout.clone());
        Ok(timeout)
    }

    async fn find_timeout(&self, server_id: &str, user_id: &str) -> AppResult<Option<Timeout>> {
        let key = (server_id.to_string(), user_id.to_string());
        Ok(self.tables.lock().unwrap().timeouts.get(&key).cloned())
    }

    async fn record_moderation_action(
        &self,
        action: ModerationAction,
    ) -> AppResult<ModerationAction> {
        let mut t = self.tables.lock().unwrap();
        t.moderation_actions
            .insert(action.id.clone(), action.clone());
        Ok(action)
    }

    async fn list_moderation_actions(&self, server_id: &str) -> AppResult<Vec<ModerationAction>> {
        let t = self.tables.lock().unwrap();
        let mut out: Vec<ModerationAction> = t
            .moderation_actions
            .values()
            .filter(|a| a.server_id == server_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(out)
    }

    async fn append_audit_log(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry> {
        let mut t = self.tables.lock().unwrap();
        t.audit_log.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn list_audit_log(&self, server_id: &str, limit: u32) -> AppResult<Vec<AuditLogEntry>> {
        let t = self.tables.lock().unwrap();
        let mut out: Vec<AuditLogEntry> = t
            .audit_log
            .values()
            .filter(|e| e.server_id == server_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn upsert_push_subscription(
        &self,
        subscription: PushSubscription,
    ) -> AppResult<PushSubscription> {
        let mut t = self.tables.lock().unwrap();
        t.push_subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn list_push_subscriptions(&self, user_id: &str) -> AppResult<Vec<PushSubscription>> {
        let t = self.tables.lock().unwrap();
        Ok(t.push_subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_push_subscription(&self, id: &str) -> AppResult<()> {
        self.tables.lock().unwrap().push_subscriptions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> User {
        User {
            id: ids::generate(ids::prefix::USER),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            display_name: username.to_string(),
            avatar_hash: None,
            password_hash: "hash".to_string(),
            created_at: ids::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada")).await.unwrap();
        let err = store.create_user(new_user("ada")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn adding_the_same_reaction_twice_is_idempotent() {
        let store = MemoryStore::new();
        let message = Message {
            id: ids::generate(ids::prefix::MESSAGE),
            channel_id: "chn_1".into(),
            conversation_id: "chn_1".into(),
            direct_thread_id: None,
            author_id: "usr_1".into(),
            body: "hi".into(),
            attachments: vec![],
            created_at: ids::now(),
            updated_at: None,
            reactions: vec![],
        };
        store.create_message(message.clone()).await.unwrap();

        let (summary, changed) = store.add_reaction(&message.id, "usr_2", "👍").await.unwrap();
        assert_eq!(summary, vec![ReactionSummary { emoji: "👍".into(), count: 1 }]);
        assert!(changed);

        let (summary, changed) = store.add_reaction(&message.id, "usr_2", "👍").await.unwrap();
        assert_eq!(summary, vec![ReactionSummary { emoji: "👍".into(), count: 1 }]);
        assert!(!changed);

        let (summary, changed) = store.remove_reaction(&message.id, "usr_2", "👍").await.unwrap();
        assert!(summary.is_empty());
        assert!(changed);

        let (summary, changed) = store.remove_reaction(&message.id, "usr_2", "👍").await.unwrap();
        assert!(summary.is_empty());
        assert!(!changed);
    }

    #[tokio::test]
    async fn message_pagination_windows_newest_first_but_returns_ascending() {
        let store = MemoryStore::new();
        let mut ids_created = vec![];
        for i in 0..5 {
            let msg = Message {
                id: ids::generate(ids::prefix::MESSAGE),
                channel_id: "chn_1".into(),
                conversation_id: "chn_1".into(),
                direct_thread_id: None,
                author_id: "usr_1".into(),
                body: format!("msg {i}"),
                attachments: vec![],
                created_at: ids::now(),
                updated_at: None,
                reactions: vec![],
            };
            ids_created.push(msg.id.clone());
            store.create_message(msg).await.unwrap();
        }

        let page = store.list_messages("chn_1", None, 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.items.last().unwrap().id, *ids_created.last().unwrap());
        assert!(page.items[0].id < page.items[1].id);
    }
}
