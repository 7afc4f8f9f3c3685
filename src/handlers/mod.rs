//! HTTP surface assembly (§6).

pub mod auth;
pub mod authz;
pub mod channels;
pub mod direct_threads;
pub mod extract;
pub mod friends;
pub mod messages;
pub mod presence;
pub mod push;
pub mod search;
pub mod servers;
pub mod users;
pub mod voice;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .server
                .cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*")),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(86400));

    Router::new()
        // Auth
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        // Users
        .route("/v1/me", get(users::me))
        .route("/v1/users/search", get(users::search))
        .route("/v1/users/:id", get(users::get))
        // Friends
        .route("/v1/friends", get(friends::list))
        .route("/v1/friends/:id", delete(friends::remove))
        .route("/v1/friends/requests", get(friends::list_requests).post(friends::create_request))
        .route("/v1/friends/requests/:id", post(friends::respond_request))
        // Servers
        .route("/v1/servers", post(servers::create).get(servers::list))
        .route("/v1/servers/:server_id", get(servers::get).delete(servers::delete))
        .route("/v1/servers/:server_id/members/@me", delete(servers::leave))
        .route("/v1/servers/:server_id/members", get(servers::list_members))
        .route(
            "/v1/servers/:server_id/members/:user_id",
            get(servers::get_member).delete(servers::kick_member),
        )
        .route("/v1/servers/:server_id/bans", get(servers::list_bans))
        .route(
            "/v1/servers/:server_id/bans/:user_id",
            put(servers::ban_member).delete(servers::unban_member),
        )
        .route("/v1/servers/:server_id/timeouts/:user_id", put(servers::timeout_member))
        .route("/v1/servers/:server_id/audit-log", get(servers::list_audit_log))
        .route("/v1/servers/:server_id/roles", get(servers::list_roles).post(servers::create_role))
        .route(
            "/v1/servers/:server_id/roles/:role_id",
            patch(servers::update_role).delete(servers::delete_role),
        )
        .route(
            "/v1/servers/:server_id/members/:user_id/roles/:role_id",
            put(servers::assign_role).delete(servers::remove_role),
        )
        .route("/v1/servers/:server_id/invites", get(servers::list_invites).post(servers::create_invite))
        .route("/v1/servers/:server_id/invites/:code", delete(servers::delete_invite))
        .route("/v1/invites/:code", post(servers::join_by_invite))
        // Channels
        .route("/v1/servers/:server_id/channels", post(channels::create).get(channels::list))
        .route("/v1/channels/:channel_id", patch(channels::update).delete(channels::delete))
        .route("/v1/channels/:channel_id/overwrites", put(channels::put_overwrites))
        .route("/v1/channels/:channel_id/typing", post(channels::typing))
        // Messages
        .route("/v1/channels/:channel_id/messages", post(messages::create).get(messages::list))
        .route("/v1/messages/:message_id", patch(messages::update).delete(messages::delete))
        .route(
            "/v1/messages/:message_id/reactions/:emoji",
            post(messages::add_reaction).delete(messages::remove_reaction),
        )
        // Direct threads
        .route("/v1/direct-threads", post(direct_threads::create).get(direct_threads::list))
        .route("/v1/direct-threads/:id", get(direct_threads::get))
        .route("/v1/direct-threads/:id/participants/@me", delete(direct_threads::leave))
        .route(
            "/v1/direct-threads/:id/messages",
            post(direct_threads::send_message).get(direct_threads::list_messages),
        )
        .route(
            "/v1/direct-threads/:id/read-marker",
            get(direct_threads::get_read_marker).put(direct_threads::put_read_marker),
        )
        .route("/v1/direct-threads/:id/typing", post(direct_threads::typing))
        // Presence
        .route("/v1/presence", put(presence::put))
        .route("/v1/presence/me", get(presence::me))
        .route("/v1/presence/:id", get(presence::get))
        .route("/v1/presence/bulk", post(presence::bulk))
        // Push subscriptions
        .route("/v1/notifications/push-subscriptions", post(push::create).get(push::list))
        .route("/v1/notifications/push-subscriptions/:id", delete(push::delete))
        // Search
        .route("/v1/search", get(search::search))
        // Voice
        .route("/v1/channels/:channel_id/voice/join", post(voice::join))
        .route("/v1/channels/:channel_id/voice/leave", post(voice::leave))
        .route("/v1/channels/:channel_id/voice/state", patch(voice::update_state))
        .route("/v1/channels/:channel_id/voice/participants", get(voice::participants))
        .route("/v1/channels/:channel_id/voice/signal", post(voice::signal))
        // WebSocket gateway
        .route("/v1/ws", get(ws::ws_upgrade))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
