//! Realtime fan-out hub (C8, §4.7), grounded on the teacher's
//! `AppState::{ws_sessions, channel_subs}` + `broadcast_to_channel/_user/_server`
//! pattern (`api.rs`), generalized to this spec's conversation-scoped and
//! direct-thread-participant-scoped fan-out rules.
//!
//! One broadcast channel per connected user (`userSockets`), fed by a
//! `conversationSockets` index mapping a conversation (channel or direct
//! thread) id to the set of subscribed user ids. A single critical section
//! (the `DashMap` per-shard lock) keeps subscribe/unsubscribe/publish
//! linearizable per key, matching §5's concurrency model.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::models::WsEvent;

const SOCKET_BUFFER: usize = 256;

pub struct Hub {
    /// user_id → broadcast sender fanning out to every socket that user has open.
    user_sockets: Arc<DashMap<String, broadcast::Sender<WsEvent>>>,
    /// conversation_id → set of user_ids currently subscribed.
    conversation_subs: Arc<DashMap<String, HashSet<String>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            user_sockets: Arc::new(DashMap::new()),
            conversation_subs: Arc::new(DashMap::new()),
        }
    }

    /// Register a newly-connected socket for `user_id`; returns the receiver
    /// the WebSocket write loop polls.
    pub fn connect(&self, user_id: &str) -> broadcast::Receiver<WsEvent> {
        self.user_sockets
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(SOCKET_BUFFER).0)
            .subscribe()
    }

    /// Drop bookkeeping for a disconnected socket. Safe to call even if other
    /// sockets for the same user remain connected — the broadcast sender is
    /// only torn down once its receiver count reaches zero, which `tokio`
    /// tracks for us; we just drop our subscription index entries for this
    /// conversation set.
    pub fn disconnect(&self, user_id: &str, conversation_ids: &[String]) {
        for id in conversation_ids {
            if let Some(mut subs) = self.conversation_subs.get_mut(id) {
                subs.remove(user_id);
            }
        }
    }

    pub fn subscribe(&self, user_id: &str, conversation_id: &str) {
        self.conversation_subs
            .entry(conversation_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn unsubscribe(&self, user_id: &str, conversation_id: &str) {
        if let Some(mut subs) = self.conversation_subs.get_mut(conversation_id) {
            subs.remove(user_id);
        }
    }

    /// Fan out to every user subscribed to a channel or direct thread.
    pub fn publish_to_conversation(&self, conversation_id: &str, event: &WsEvent) {
        if let Some(subs) = self.conversation_subs.get(conversation_id) {
            for user_id in subs.iter() {
                self.publish_to_user(user_id, event);
            }
        }
    }

    /// Deliver an event to every socket a specific user has open (ack frames,
    /// their own echoed writes, presence updates to friends).
    pub fn publish_to_user(&self, user_id: &str, event: &WsEvent) {
        if let Some(sender) = self.user_sockets.get(user_id) {
            let _ = sender.send(event.clone());
        }
    }

    pub fn publish_to_users(&self, user_ids: &[String], event: &WsEvent) {
        for id in user_ids {
            self.publish_to_user(id, event);
        }
    }

    /// Fan out once per recipient across the union of a conversation's
    /// subscribers and an explicit extra user list (§4.7), so a user who is
    /// both doesn't get the event twice.
    pub fn publish(&self, conversation_id: &str, event: &WsEvent, additional_user_ids: &[String]) {
        let mut recipients: HashSet<String> = additional_user_ids.iter().cloned().collect();
        if let Some(subs) = self.conversation_subs.get(conversation_id) {
            recipients.extend(subs.iter().cloned());
        }
        for user_id in &recipients {
            self.publish_to_user(user_id, event);
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.user_sockets
            .get(user_id)
            .map(|s| s.receiver_count() > 0)
            .unwrap_or(false)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_only_subscribed_users() {
        let hub = Hub::new();
        let mut rx_a = hub.connect("usr_a");
        let _rx_b = hub.connect("usr_b");

        hub.subscribe("usr_a", "chn_1");
        hub.publish_to_conversation("chn_1", &WsEvent::Pong);

        let received = rx_a.try_recv();
        assert!(received.is_ok());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let hub = Hub::new();
        let mut rx = hub.connect("usr_a");
        hub.subscribe("usr_a", "chn_1");
        hub.unsubscribe("usr_a", "chn_1");
        hub.publish_to_conversation("chn_1", &WsEvent::Pong);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_sends_once_to_a_user_who_is_both_subscriber_and_additional() {
        let hub = Hub::new();
        let mut rx_a = hub.connect("usr_a");
        let mut rx_b = hub.connect("usr_b");
        hub.subscribe("usr_a", "thr_1");

        hub.publish("thr_1", &WsEvent::Pong, &["usr_a".to_string(), "usr_b".to_string()]);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
