//! WebSocket front (C9, §4.8).
//!
//! Regrounded from the teacher's post-upgrade `Identify` frame
//! (`api.rs::handle_ws`) to authenticating via the `?token=` query string
//! before the upgrade completes — an invalid token rejects the upgrade itself
//! with 401 rather than opening the socket and closing it. Once connected,
//! the split sender/receiver + forwarding-task pattern is kept verbatim from
//! the teacher.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::models::{ClientFrame, PresenceStatusKind, WsEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = match query.token {
        Some(t) => t,
        None => return axum::http::StatusCode::UNAUTHORIZED.into_response(),
    };

    let session = match state.store.find_session(&token).await {
        Ok(Some(session)) => session,
        _ => return axum::http::StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, session.user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let mut rx = state.hub.connect(&user_id);
    let (mut sender, mut receiver) = socket.split();

    let _ = sender
        .send(WsMessage::Text(
            serde_json::to_string(&WsEvent::Ready {
                user_id: user_id.clone(),
            })
            .unwrap_or_default()
            .into(),
        ))
        .await;

    state
        .presence
        .set_status(&user_id, PresenceStatusKind::Online);
    notify_friends_of_presence(&state, &user_id, PresenceStatusKind::Online).await;

    let mut forward_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let text = serde_json::to_string(&event).unwrap_or_default();
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let state_for_recv = state.clone();
    let user_id_for_recv = user_id.clone();
    let subscriptions: Arc<tokio::sync::Mutex<Vec<String>>> = Arc::new(tokio::sync::Mutex::new(vec![]));
    let subs_for_recv = subscriptions.clone();

    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                WsMessage::Close(_) => break,
                WsMessage::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Subscribe { conversation_id }) => {
                        state_for_recv.hub.subscribe(&user_id_for_recv, &conversation_id);
                        subs_for_recv.lock().await.push(conversation_id.clone());
                        state_for_recv.hub.publish_to_user(
                            &user_id_for_recv,
                            &WsEvent::Subscribed {
                                channel_id: conversation_id,
                            },
                        );
                    }
                    Ok(ClientFrame::Unsubscribe { conversation_id }) => {
                        state_for_recv.hub.unsubscribe(&user_id_for_recv, &conversation_id);
                        subs_for_recv
                            .lock()
                            .await
                            .retain(|id| id != &conversation_id);
                        state_for_recv.hub.publish_to_user(
                            &user_id_for_recv,
                            &WsEvent::Unsubscribed {
                                channel_id: conversation_id,
                            },
                        );
                    }
                    Ok(ClientFrame::Ping) => {
                        state_for_recv
                            .hub
                            .publish_to_user(&user_id_for_recv, &WsEvent::Pong);
                    }
                    Err(_) => {
                        state_for_recv.hub.publish_to_user(
                            &user_id_for_recv,
                            &WsEvent::Error {
                                error: "unrecognized frame".to_string(),
                            },
                        );
                    }
                },
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    let conversations = subscriptions.lock().await.clone();
    state.hub.disconnect(&user_id, &conversations);
    state.presence.set_offline(&user_id);
    notify_friends_of_presence(&state, &user_id, PresenceStatusKind::Offline).await;
    state.voice.leave_all(&user_id).await;

    tracing::info!(user_id = %user_id, "websocket disconnected");
}

async fn notify_friends_of_presence(state: &AppState, user_id: &str, status: PresenceStatusKind) {
    let friends = match state.store.list_friends(user_id).await {
        Ok(list) => list,
        Err(_) => return,
    };
    let presence = crate::models::PresenceState {
        user_id: user_id.to_string(),
        status,
        last_seen_at: crate::ids::now(),
    };
    for friendship in friends {
        if friendship.status != crate::models::FriendRequestStatus::Accepted {
            continue;
        }
        let other = if friendship.from_user_id == user_id {
            &friendship.to_user_id
        } else {
            &friendship.from_user_id
        };
        state
            .hub
            .publish_to_user(other, &WsEvent::PresenceUpdated(presence.clone()));
    }
}
