//! Postgres-backed store (§4.2), grounded on the teacher's `db.rs`
//! per-entity query-module layout, generalized to every §3 entity and to
//! this crate's opaque string IDs. Uses `query`/`query_as` throughout (never
//! the compile-time `query!` macros) so the crate builds without a live
//! database — the teacher's own convention.
//!
//! Structured fields that don't map to scalar SQL columns (`HashSet<Capability>`,
//! `Vec<Attachment>`, participant lists) are stored as `JSONB` via
//! `sqlx::types::Json` and decoded back into the domain model after the query.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Pool, Postgres};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;

use super::{Page, Store};

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pg_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// `read_markers.conversation_id` is polymorphic (a channel id or a direct
/// thread id) and carries no foreign key, so it needs an explicit sweep keyed
/// by the channel's own id and by any thread the channel backs, ahead of the
/// FK-cascaded delete of the channel/server row itself.
async fn delete_read_markers_for_channel(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    channel_id: &str,
) -> AppResult<()> {
    sqlx::query("DELETE FROM read_markers WHERE conversation_id = $1")
        .bind(channel_id)
        .execute(&mut **tx)
        .await?;
    let thread_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM direct_threads WHERE channel_id = $1")
        .bind(channel_id)
        .fetch_all(&mut **tx)
        .await?;
    for thread_id in &thread_ids {
        sqlx::query("DELETE FROM read_markers WHERE conversation_id = $1")
            .bind(thread_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn reaction_summary(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    message_id: &str,
) -> AppResult<Vec<ReactionSummary>> {
    let counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT emoji, COUNT(*) FROM message_reactions WHERE message_id = $1 GROUP BY emoji ORDER BY emoji",
    )
    .bind(message_id)
    .fetch_all(&mut **tx)
    .await?;
    let summary: Vec<ReactionSummary> = counts
        .into_iter()
        .map(|(emoji, count)| ReactionSummary {
            emoji,
            count: count as usize,
        })
        .collect();

    sqlx::query("UPDATE messages SET reactions = $2 WHERE id = $1")
        .bind(message_id)
        .bind(Json(&summary))
        .execute(&mut **tx)
        .await?;
    Ok(summary)
}

// ─── Row shapes ─────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    username: String,
    display_name: String,
    avatar_hash: Option<String>,
    password_hash: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            email: r.email,
            username: r.username,
            display_name: r.display_name,
            avatar_hash: r.avatar_hash,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: String,
    server_id: String,
    name: String,
    permissions: Json<Vec<Capability>>,
    is_default: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RoleRow> for Role {
    fn from(r: RoleRow) -> Self {
        Role {
            id: r.id,
            server_id: r.server_id,
            name: r.name,
            permissions: r.permissions.0.into_iter().collect(),
            is_default: r.is_default,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct OverwriteRow {
    id: String,
    channel_id: String,
    target: String,
    target_id: String,
    allow: Json<Vec<Capability>>,
    deny: Json<Vec<Capability>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OverwriteRow> for Overwrite {
    fn from(r: OverwriteRow) -> Self {
        Overwrite {
            id: r.id,
            channel_id: r.channel_id,
            target: if r.target == "role" {
                OverwriteTarget::Role
            } else {
                OverwriteTarget::Member
            },
            target_id: r.target_id,
            allow: r.allow.0.into_iter().collect(),
            deny: r.deny.0.into_iter().collect(),
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    channel_id: String,
    conversation_id: String,
    direct_thread_id: Option<String>,
    author_id: String,
    body: String,
    attachments: Json<Vec<Attachment>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    reactions: Json<Vec<ReactionSummary>>,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Message {
            id: r.id,
            channel_id: r.channel_id,
            conversation_id: r.conversation_id,
            direct_thread_id: r.direct_thread_id,
            author_id: r.author_id,
            body: r.body,
            attachments: r.attachments.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
            reactions: r.reactions.0,
        }
    }
}

#[async_trait]
impl Store for SqlStore {
    // ─── Users ──────────────────────────────────────────────────────────

    async fn create_user(&self, user: User) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, username, display_name, avatar_hash, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, username, display_name, avatar_hash, password_hash, created_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.avatar_hash)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if pg_unique_violation(&e) {
                AppError::Conflict("email or username already in use".into())
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(row.into())
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, display_name, avatar_hash, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, display_name, avatar_hash, password_hash, created_at FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, display_name, avatar_hash, password_hash, created_at FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, display_name, avatar_hash, password_hash, created_at
            FROM users WHERE username ILIKE $1 OR display_name ILIKE $1
            ORDER BY username LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ─── Sessions ───────────────────────────────────────────────────────

    async fn create_session(&self, session: Session) -> AppResult<Session> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(&session.user_id)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(session)
    }

    async fn find_session(&self, token: &str) -> AppResult<Option<Session>> {
        let row: Option<(String, String, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as("SELECT token, user_id, created_at FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(token, user_id, created_at)| Session {
            token,
            user_id,
            created_at,
        }))
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Servers & members ──────────────────────────────────────────────

    async fn create_server(&self, server: Server) -> AppResult<Server> {
        sqlx::query(
            r#"
            INSERT INTO servers (id, name, owner_id, created_at, is_direct_thread_backing)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&server.id)
        .bind(&server.name)
        .bind(&server.owner_id)
        .bind(server.created_at)
        .bind(server.is_direct_thread_backing)
        .execute(&self.pool)
        .await?;
        Ok(server)
    }

    async fn find_server(&self, id: &str) -> AppResult<Option<Server>> {
        let row: Option<(String, String, String, chrono::DateTime<chrono::Utc>, bool)> = sqlx::query_as(
            "SELECT id, name, owner_id, created_at, is_direct_thread_backing FROM servers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, owner_id, created_at, is_direct_thread_backing)| Server {
            id,
            name,
            owner_id,
            created_at,
            is_direct_thread_backing,
        }))
    }

    async fn list_servers_for_user(&self, user_id: &str) -> AppResult<Vec<Server>> {
        let rows: Vec<(String, String, String, chrono::DateTime<chrono::Utc>, bool)> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.owner_id, s.created_at, s.is_direct_thread_backing
            FROM servers s
            INNER JOIN members m ON m.server_id = s.id
            WHERE m.user_id = $1
            ORDER BY s.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, name, owner_id, created_at, is_direct_thread_backing)| Server {
                    id,
                    name,
                    owner_id,
                    created_at,
                    is_direct_thread_backing,
                },
            )
            .collect())
    }

    async fn delete_server(&self, id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let channel_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM channels WHERE server_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        for channel_id in &channel_ids {
            delete_read_markers_for_channel(&mut tx, channel_id).await?;
        }
        // `channels`, `members`, `roles`, `invites`, `bans`, `timeouts`,
        // `moderation_actions`, and `audit_log` all carry
        // `server_id REFERENCES servers ON DELETE CASCADE`; deleting the
        // server row sweeps them (and channels sweep their own messages,
        // reactions, overwrites, and direct_threads in turn).
        sqlx::query("DELETE FROM servers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_member(&self, member: Member) -> AppResult<Member> {
        sqlx::query(
            r#"
            INSERT INTO members (server_id, user_id, role_ids, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (server_id, user_id) DO UPDATE SET role_ids = EXCLUDED.role_ids
            "#,
        )
        .bind(&member.server_id)
        .bind(&member.user_id)
        .bind(Json(member.role_ids.iter().cloned().collect::<Vec<_>>()))
        .bind(member.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_member(&self, server_id: &str, user_id: &str) -> AppResult<Option<Member>> {
        let row: Option<(String, String, Json<Vec<String>>, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT server_id, user_id, role_ids, joined_at FROM members WHERE server_id = $1 AND user_id = $2",
            )
            .bind(server_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(server_id, user_id, role_ids, joined_at)| Member {
            server_id,
            user_id,
            role_ids: role_ids.0.into_iter().collect(),
            joined_at,
        }))
    }

    async fn list_members(&self, server_id: &str) -> AppResult<Vec<Member>> {
        let rows: Vec<(String, String, Json<Vec<String>>, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT server_id, user_id, role_ids, joined_at FROM members WHERE server_id = $1 ORDER BY joined_at",
            )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(server_id, user_id, role_ids, joined_at)| Member {
                server_id,
                user_id,
                role_ids: role_ids.0.into_iter().collect(),
                joined_at,
            })
            .collect())
    }

    async fn remove_member(&self, server_id: &str, user_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM members WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Roles ──────────────────────────────────────────────────────────

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, server_id, name, permissions, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&role.id)
        .bind(&role.server_id)
        .bind(Json(role.permissions.iter().copied().collect::<Vec<_>>()))
        .bind(&role.name)
        .bind(role.is_default)
        .bind(role.created_at)
        .execute(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_role(&self, server_id: &str, role_id: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, server_id, name, permissions, is_default, created_at FROM roles WHERE server_id = $1 AND id = $2",
        )
        .bind(server_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_roles(&self, server_id: &str) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, server_id, name, permissions, is_default, created_at FROM roles WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_role(&self, role: Role) -> AppResult<Role> {
        let result = sqlx::query(
            "UPDATE roles SET name = $3, permissions = $4 WHERE server_id = $1 AND id = $2",
        )
        .bind(&role.server_id)
        .bind(&role.id)
        .bind(&role.name)
        .bind(Json(role.permissions.iter().copied().collect::<Vec<_>>()))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("role".into()));
        }
        Ok(role)
    }

    async fn delete_role(&self, server_id: &str, role_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM roles WHERE server_id = $1 AND id = $2")
            .bind(server_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Channels & overwrites ──────────────────────────────────────────

    async fn create_channel(&self, channel: Channel) -> AppResult<Channel> {
        let type_str = match channel.channel_type {
            ChannelType::Text => "text",
            ChannelType::Voice => "voice",
        };
        sqlx::query(
            "INSERT INTO channels (id, server_id, name, channel_type, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&channel.id)
        .bind(&channel.server_id)
        .bind(&channel.name)
        .bind(type_str)
        .bind(channel.created_at)
        .execute(&self.pool)
        .await?;
        Ok(channel)
    }

    async fn find_channel(&self, id: &str) -> AppResult<Option<Channel>> {
        let row: Option<(String, String, String, String, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT id, server_id, name, channel_type, created_at FROM channels WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, server_id, name, channel_type, created_at)| Channel {
            id,
            server_id,
            name,
            channel_type: if channel_type == "voice" {
                ChannelType::Voice
            } else {
                ChannelType::Text
            },
            created_at,
        }))
    }

    async fn list_channels(&self, server_id: &str) -> AppResult<Vec<Channel>> {
        let rows: Vec<(String, String, String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT id, server_id, name, channel_type, created_at FROM channels WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, server_id, name, channel_type, created_at)| Channel {
                id,
                server_id,
                name,
                channel_type: if channel_type == "voice" {
                    ChannelType::Voice
                } else {
                    ChannelType::Text
                },
                created_at,
            })
            .collect())
    }

    async fn update_channel(&self, channel: Channel) -> AppResult<Channel> {
        let result = sqlx::query("UPDATE channels SET name = $2 WHERE id = $1")
            .bind(&channel.id)
            .bind(&channel.name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("channel".into()));
        }
        Ok(channel)
    }

    async fn delete_channel(&self, id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        delete_read_markers_for_channel(&mut tx, id).await?;
        // `messages`, `overwrites`, and `direct_threads` carry
        // `channel_id REFERENCES channels ON DELETE CASCADE`; `message_reactions`
        // cascades off `messages` in turn.
        sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_overwrite(&self, overwrite: Overwrite) -> AppResult<Overwrite> {
        let target_str = match overwrite.target {
            OverwriteTarget::Role => "role",
            OverwriteTarget::Member => "member",
        };
        sqlx::query(
            r#"
            INSERT INTO overwrites (id, channel_id, target, target_id, allow, deny, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (channel_id, target_id) DO UPDATE SET allow = EXCLUDED.allow, deny = EXCLUDED.deny
            "#,
        )
        .bind(&overwrite.id)
        .bind(&overwrite.channel_id)
        .bind(target_str)
        .bind(&overwrite.target_id)
        .bind(Json(overwrite.allow.iter().copied().collect::<Vec<_>>()))
        .bind(Json(overwrite.deny.iter().copied().collect::<Vec<_>>()))
        .bind(overwrite.created_at)
        .execute(&self.pool)
        .await?;
        Ok(overwrite)
    }

    async fn list_overwrites(&self, channel_id: &str) -> AppResult<Vec<Overwrite>> {
        let rows = sqlx::query_as::<_, OverwriteRow>(
            "SELECT id, channel_id, target, target_id, allow, deny, created_at FROM overwrites WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_overwrite(&self, channel_id: &str, overwrite_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM overwrites WHERE channel_id = $1 AND id = $2")
            .bind(channel_id)
            .bind(overwrite_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_channels(&self, server_id: &str, query: &str, limit: u32) -> AppResult<Vec<Channel>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows: Vec<(String, String, String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT id, server_id, name, channel_type, created_at FROM channels
            WHERE server_id = $1 AND name ILIKE $2 ORDER BY name LIMIT $3",
        )
        .bind(server_id)
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, server_id, name, channel_type, created_at)| Channel {
                id,
                server_id,
                name,
                channel_type: if channel_type == "voice" {
                    ChannelType::Voice
                } else {
                    ChannelType::Text
                },
                created_at,
            })
            .collect())
    }

    // ─── Messages & reactions ───────────────────────────────────────────

    async fn create_message(&self, message: Message) -> AppResult<Message> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, channel_id, conversation_id, direct_thread_id, author_id, body, attachments, created_at, updated_at, reactions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&message.id)
        .bind(&message.channel_id)
        .bind(&message.conversation_id)
        .bind(&message.direct_thread_id)
        .bind(&message.author_id)
        .bind(&message.body)
        .bind(Json(&message.attachments))
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(Json(&message.reactions))
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    async fn find_message(&self, id: &str) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, channel_id, conversation_id, direct_thread_id, author_id, body, attachments, created_at, updated_at, reactions FROM messages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let fetch_limit = limit as i64 + 1;
        let rows = if let Some(cursor) = before {
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT id, channel_id, conversation_id, direct_thread_id, author_id, body, attachments, created_at, updated_at, reactions
                FROM messages WHERE conversation_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3
                "#,
            )
            .bind(conversation_id)
            .bind(cursor)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT id, channel_id, conversation_id, direct_thread_id, author_id, body, attachments, created_at, updated_at, reactions
                FROM messages WHERE conversation_id = $1 ORDER BY id DESC LIMIT $2
                "#,
            )
            .bind(conversation_id)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?
        };

        let mut items: Vec<Message> = rows.into_iter().map(Into::into).collect();
        let has_more = items.len() > limit as usize;
        items.truncate(limit as usize);
        items.reverse();
        Ok(Page { items, has_more })
    }

    async fn update_message(&self, message: Message) -> AppResult<Message> {
        let result = sqlx::query("UPDATE messages SET body = $2, updated_at = $3 WHERE id = $1")
            .bind(&message.id)
            .bind(&message.body)
            .bind(message.updated_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("message".into()));
        }
        Ok(message)
    }

    async fn delete_message(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_messages(
        &self,
        conversation_id: &str,
        query: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, channel_id, conversation_id, direct_thread_id, author_id, body, attachments, created_at, updated_at, reactions
            FROM messages
            WHERE conversation_id = $1 AND body ILIKE $2
            ORDER BY id DESC LIMIT $3
            "#,
        )
        .bind(conversation_id)
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, user_id, emoji) VALUES ($1, $2, $3)
            ON CONFLICT (message_id, user_id, emoji) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&mut *tx)
        .await?;
        let changed = result.rows_affected() > 0;

        let summary = reaction_summary(&mut tx, message_id).await?;
        tx.commit().await?;
        Ok((summary, changed))
    }

    async fn remove_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<(Vec<ReactionSummary>, bool)> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&mut *tx)
        .await?;
        let changed = result.rows_affected() > 0;

        let summary = reaction_summary(&mut tx, message_id).await?;
        tx.commit().await?;
        Ok((summary, changed))
    }

    // ─── Direct threads ─────────────────────────────────────────────────

    async fn create_direct_thread(&self, thread: DirectThread) -> AppResult<DirectThread> {
        let kind_str = match thread.kind {
            DirectThreadKind::Dm => "dm",
            DirectThreadKind::Group => "group",
        };
        sqlx::query(
            r#"
            INSERT INTO direct_threads (id, channel_id, kind, owner_id, title, participant_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&thread.id)
        .bind(&thread.channel_id)
        .bind(kind_str)
        .bind(&thread.owner_id)
        .bind(&thread.title)
        .bind(Json(&thread.participant_ids))
        .bind(thread.created_at)
        .bind(thread.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(thread)
    }

    async fn find_direct_thread(&self, id: &str) -> AppResult<Option<DirectThread>> {
        self.direct_thread_row("id = $1", id).await
    }

    async fn find_direct_thread_by_participants(
        &self,
        participant_ids: &[String],
    ) -> AppResult<Option<DirectThread>> {
        let mut wanted: Vec<String> = participant_ids.to_vec();
        wanted.sort();
        let all = self.list_all_dm_threads().await?;
        Ok(all.into_iter().find(|t| {
            let mut have = t.participant_ids.clone();
            have.sort();
            have == wanted
        }))
    }

    async fn list_direct_threads_for_user(&self, user_id: &str) -> AppResult<Vec<DirectThread>> {
        let rows = sqlx::query_as::<_, DirectThreadRow>(
            r#"
            SELECT id, channel_id, kind, owner_id, title, participant_ids, created_at, updated_at
            FROM direct_threads WHERE participant_ids @> $1::jsonb
            ORDER BY updated_at DESC
            "#,
        )
        .bind(serde_json::json!([user_id]))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ─── Read markers ───────────────────────────────────────────────────

    async fn put_read_marker(&self, marker: ReadMarker) -> AppResult<ReadMarker> {
        sqlx::query(
            r#"
            INSERT INTO read_markers (conversation_id, user_id, last_read_message_id, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (conversation_id, user_id)
            DO UPDATE SET last_read_message_id = EXCLUDED.last_read_message_id, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&marker.conversation_id)
        .bind(&marker.user_id)
        .bind(&marker.last_read_message_id)
        .bind(marker.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(marker)
    }

    async fn find_read_marker(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReadMarker>> {
        let row: Option<(String, String, Option<String>, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT conversation_id, user_id, last_read_message_id, updated_at FROM read_markers WHERE conversation_id = $1 AND user_id = $2",
            )
            .bind(conversation_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(
            |(conversation_id, user_id, last_read_message_id, updated_at)| ReadMarker {
                conversation_id,
                user_id,
                last_read_message_id,
                updated_at,
            },
        ))
    }

    // ─── Friends ─────────────────────────────────────────────────────────

    async fn create_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        let status_str = friend_status_str(request.status);
        sqlx::query(
            r#"
            INSERT INTO friend_requests (id, from_user_id, to_user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&request.id)
        .bind(&request.from_user_id)
        .bind(&request.to_user_id)
        .bind(status_str)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if pg_unique_violation(&e) {
                AppError::Conflict("friend request already exists".into())
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(request)
    }

    async fn find_friend_request(&self, id: &str) -> AppResult<Option<FriendRequest>> {
        self.friend_request_row("id = $1", id).await
    }

    async fn find_friend_request_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT id, from_user_id, to_user_id, status, created_at, updated_at FROM friend_requests
            WHERE (from_user_id = $1 AND to_user_id = $2) OR (from_user_id = $2 AND to_user_id = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        let status_str = friend_status_str(request.status);
        let result = sqlx::query(
            "UPDATE friend_requests SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(&request.id)
        .bind(status_str)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("friend request".into()));
        }
        Ok(request)
    }

    async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            "SELECT id, from_user_id, to_user_id, status, created_at, updated_at FROM friend_requests WHERE from_user_id = $1 OR to_user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ─── Invites ─────────────────────────────────────────────────────────

    async fn create_invite(&self, invite: Invite) -> AppResult<Invite> {
        sqlx::query(
            r#"
            INSERT INTO invites (code, server_id, created_by, created_at, expires_at, max_uses, uses)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&invite.code)
        .bind(&invite.server_id)
        .bind(&invite.created_by)
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .bind(invite.max_uses.map(|v| v as i32))
        .bind(invite.uses as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if pg_unique_violation(&e) {
                AppError::Conflict("invite code already exists".into())
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(invite)
    }

    async fn find_invite(&self, code: &str) -> AppResult<Option<Invite>> {
        self.invite_row("code = $1", code).await
    }

    async fn increment_invite_uses(&self, code: &str) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, InviteRow>(
            "UPDATE invites SET uses = uses + 1 WHERE code = $1 RETURNING code, server_id, created_by, created_at, expires_at, max_uses, uses",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or_else(|| AppError::NotFound("invite".into()))
    }

    async fn list_invites(&self, server_id: &str) -> AppResult<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(
            "SELECT code, server_id, created_by, created_at, expires_at, max_uses, uses FROM invites WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_invite(&self, code: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM invites WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Moderation ──────────────────────────────────────────────────────

    async fn create_ban(&self, ban: Ban) -> AppResult<Ban> {
        sqlx::query(
            r#"
            INSERT INTO bans (server_id, user_id, reason, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (server_id, user_id) DO UPDATE SET reason = EXCLUDED.reason
            "#,
        )
        .bind(&ban.server_id)
        .bind(&ban.user_id)
        .bind(&ban.reason)
        .bind(ban.created_at)
        .execute(&self.pool)
        .await?;
        Ok(ban)
    }

    async fn find_ban(&self, server_id: &str, user_id: &str) -> AppResult<Option<Ban>> {
        let row: Option<(String, String, Option<String>, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT server_id, user_id, reason, created_at FROM bans WHERE server_id = $1 AND user_id = $2",
            )
            .bind(server_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(server_id, user_id, reason, created_at)| Ban {
            server_id,
            user_id,
            reason,
            created_at,
        }))
    }

    async fn list_bans(&self, server_id: &str) -> AppResult<Vec<Ban>> {
        let rows: Vec<(String, String, Option<String>, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                "SELECT server_id, user_id, reason, created_at FROM bans WHERE server_id = $1 ORDER BY created_at",
            )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(server_id, user_id, reason, created_at)| Ban {
                server_id,
                user_id,
                reason,
                created_at,
            })
            .collect())
    }

    async fn delete_ban(&self, server_id: &str, user_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM bans WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_timeout(&self, timeout: Timeout) -> AppResult<Timeout> {
        sqlx::query(
            r#"
            INSERT INTO timeouts (server_id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (server_id, user_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&timeout.server_id)
        .bind(&timeout.user_id)
        .bind(timeout.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(timeout)
    }

    async fn find_timeout(&self, server_id: &str, user_id: &str) -> AppResult<Option<Timeout>> {
        let row: Option<(String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT server_id, user_id, expires_at FROM timeouts WHERE server_id = $1 AND user_id = $2",
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(server_id, user_id, expires_at)| Timeout {
            server_id,
            user_id,
            expires_at,
        }))
    }

    async fn record_moderation_action(
        &self,
        action: ModerationAction,
    ) -> AppResult<ModerationAction> {
        let type_str = moderation_type_str(action.action_type);
        sqlx::query(
            r#"
            INSERT INTO moderation_actions (id, server_id, actor_id, target_user_id, action_type, reason, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&action.id)
        .bind(&action.server_id)
        .bind(&action.actor_id)
        .bind(&action.target_user_id)
        .bind(type_str)
        .bind(&action.reason)
        .bind(action.expires_at)
        .bind(action.created_at)
        .execute(&self.pool)
        .await?;
        Ok(action)
    }

    async fn list_moderation_actions(&self, server_id: &str) -> AppResult<Vec<ModerationAction>> {
        let rows = sqlx::query_as::<_, ModerationActionRow>(
            "SELECT id, server_id, actor_id, target_user_id, action_type, reason, expires_at, created_at FROM moderation_actions WHERE server_id = $1 ORDER BY id DESC",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn append_audit_log(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, server_id, actor_id, target_user_id, action_type, reason, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.server_id)
        .bind(&entry.actor_id)
        .bind(&entry.target_user_id)
        .bind(&entry.action_type)
        .bind(&entry.reason)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_audit_log(&self, server_id: &str, limit: u32) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT id, server_id, actor_id, target_user_id, action_type, reason, metadata, created_at FROM audit_log WHERE server_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(server_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ─── Push subscriptions ──────────────────────────────────────────────

    async fn upsert_push_subscription(
        &self,
        subscription: PushSubscription,
    ) -> AppResult<PushSubscription> {
        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, user_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, endpoint) DO UPDATE SET p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&subscription.id)
        .bind(&subscription.user_id)
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(&subscription.user_agent)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn list_push_subscriptions(&self, user_id: &str) -> AppResult<Vec<PushSubscription>> {
        let rows = sqlx::query_as::<_, PushSubscriptionRow>(
            "SELECT id, user_id, endpoint, p256dh, auth, user_agent, created_at, updated_at FROM push_subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_push_subscription(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ─── Helpers for rows whose WHERE clause varies ────────────────────────────

impl SqlStore {
    async fn direct_thread_row(&self, clause: &str, value: &str) -> AppResult<Option<DirectThread>> {
        let sql = format!(
            "SELECT id, channel_id, kind, owner_id, title, participant_ids, created_at, updated_at FROM direct_threads WHERE {clause}"
        );
        let row = sqlx::query_as::<_, DirectThreadRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_all_dm_threads(&self) -> AppResult<Vec<DirectThread>> {
        let rows = sqlx::query_as::<_, DirectThreadRow>(
            "SELECT id, channel_id, kind, owner_id, title, participant_ids, created_at, updated_at FROM direct_threads WHERE kind = 'dm'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn friend_request_row(&self, clause: &str, value: &str) -> AppResult<Option<FriendRequest>> {
        let sql = format!(
            "SELECT id, from_user_id, to_user_id, status, created_at, updated_at FROM friend_requests WHERE {clause}"
        );
        let row = sqlx::query_as::<_, FriendRequestRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn invite_row(&self, clause: &str, value: &str) -> AppResult<Option<Invite>> {
        let sql = format!(
            "SELECT code, server_id, created_by, created_at, expires_at, max_uses, uses FROM invites WHERE {clause}"
        );
        let row = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(FromRow)]
struct DirectThreadRow {
    id: String,
    channel_id: String,
    kind: String,
    owner_id: String,
    title: Option<String>,
    participant_ids: Json<Vec<String>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DirectThreadRow> for DirectThread {
    fn from(r: DirectThreadRow) -> Self {
        DirectThread {
            id: r.id,
            channel_id: r.channel_id,
            kind: if r.kind == "group" {
                DirectThreadKind::Group
            } else {
                DirectThreadKind::Dm
            },
            owner_id: r.owner_id,
            title: r.title,
            participant_ids: r.participant_ids.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FriendRequestRow {
    id: String,
    from_user_id: String,
    to_user_id: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(r: FriendRequestRow) -> Self {
        FriendRequest {
            id: r.id,
            from_user_id: r.from_user_id,
            to_user_id: r.to_user_id,
            status: match r.status.as_str() {
                "accepted" => FriendRequestStatus::Accepted,
                "rejected" => FriendRequestStatus::Rejected,
                _ => FriendRequestStatus::Pending,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn friend_status_str(status: FriendRequestStatus) -> &'static str {
    match status {
        FriendRequestStatus::Pending => "pending",
        FriendRequestStatus::Accepted => "accepted",
        FriendRequestStatus::Rejected => "rejected",
    }
}

#[derive(FromRow)]
struct InviteRow {
    code: String,
    server_id: String,
    created_by: String,
    created_at: chrono::DateTime<chrono::Utc>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    max_uses: Option<i32>,
    uses: i32,
}

impl From<InviteRow> for Invite {
    fn from(r: InviteRow) -> Self {
        Invite {
            code: r.code,
            server_id: r.server_id,
            created_by: r.created_by,
            created_at: r.created_at,
            expires_at: r.expires_at,
            max_uses: r.max_uses.map(|v| v as u32),
            uses: r.uses as u32,
        }
    }
}

fn moderation_type_str(t: ModerationActionType) -> &'static str {
    match t {
        ModerationActionType::Kick => "kick",
        ModerationActionType::Ban => "ban",
        ModerationActionType::Timeout => "timeout",
        ModerationActionType::Unban => "unban",
    }
}

#[derive(FromRow)]
struct ModerationActionRow {
    id: String,
    server_id: String,
    actor_id: String,
    target_user_id: String,
    action_type: String,
    reason: Option<String>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ModerationActionRow> for ModerationAction {
    fn from(r: ModerationActionRow) -> Self {
        ModerationAction {
            id: r.id,
            server_id: r.server_id,
            actor_id: r.actor_id,
            target_user_id: r.target_user_id,
            action_type: match r.action_type.as_str() {
                "ban" => ModerationActionType::Ban,
                "timeout" => ModerationActionType::Timeout,
                "unban" => ModerationActionType::Unban,
                _ => ModerationActionType::Kick,
            },
            reason: r.reason,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct AuditLogRow {
    id: String,
    server_id: String,
    actor_id: String,
    target_user_id: String,
    action_type: String,
    reason: Option<String>,
    metadata: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(r: AuditLogRow) -> Self {
        AuditLogEntry {
            id: r.id,
            server_id: r.server_id,
            actor_id: r.actor_id,
            target_user_id: r.target_user_id,
            action_type: r.action_type,
            reason: r.reason,
            metadata: r.metadata,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct PushSubscriptionRow {
    id: String,
    user_id: String,
    endpoint: String,
    p256dh: String,
    auth: String,
    user_agent: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PushSubscriptionRow> for PushSubscription {
    fn from(r: PushSubscriptionRow) -> Self {
        PushSubscription {
            id: r.id,
            user_id: r.user_id,
            endpoint: r.endpoint,
            p256dh: r.p256dh,
            auth: r.auth,
            user_agent: r.user_agent,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
