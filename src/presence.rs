//! Presence and typing-indicator state (C12), adapted from the teacher's
//! `PresenceManager` (`DashMap`-backed, periodic cleanup loop) to this spec's
//! status enum and 6-second typing window (§4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::models::{PresenceState, PresenceStatusKind, TypingIndicator};

const TYPING_TTL: Duration = Duration::from_secs(6);

pub struct PresenceManager {
    statuses: Arc<DashMap<String, PresenceStatusKind>>,
    /// conversation_id → (user_id → expiry instant)
    typing: Arc<DashMap<String, HashMap<String, tokio::time::Instant>>>,
}

impl PresenceManager {
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(DashMap::new()),
            typing: Arc::new(DashMap::new()),
        }
    }

    pub fn set_status(&self, user_id: &str, status: PresenceStatusKind) -> PresenceState {
        self.statuses.insert(user_id.to_string(), status);
        PresenceState {
            user_id: user_id.to_string(),
            status,
            last_seen_at: crate::ids::now(),
        }
    }

    pub fn get_status(&self, user_id: &str) -> PresenceStatusKind {
        self.statuses
            .get(user_id)
            .map(|s| *s)
            .unwrap_or(PresenceStatusKind::Offline)
    }

    pub fn set_offline(&self, user_id: &str) -> PresenceState {
        self.set_status(user_id, PresenceStatusKind::Offline)
    }

    pub fn bulk_status(&self, user_ids: &[String]) -> Vec<PresenceState> {
        user_ids
            .iter()
            .map(|id| PresenceState {
                user_id: id.clone(),
                status: self.get_status(id),
                last_seen_at: crate::ids::now(),
            })
            .collect()
    }

    /// Record that `user_id` is typing in `conversation_id`; expires after 6s (§4.6).
    pub fn start_typing(
        &self,
        conversation_id: &str,
        direct_thread_id: Option<&str>,
        user_id: &str,
    ) -> TypingIndicator {
        self.typing
            .entry(conversation_id.to_string())
            .or_default()
            .insert(user_id.to_string(), tokio::time::Instant::now());

        TypingIndicator {
            conversation_id: conversation_id.to_string(),
            direct_thread_id: direct_thread_id.map(str::to_string),
            user_id: user_id.to_string(),
            is_typing: true,
            expires_at: crate::ids::now() + chrono::Duration::milliseconds(crate::models::TYPING_TTL_MS),
        }
    }

    pub fn stop_typing(&self, conversation_id: &str, user_id: &str) {
        if let Some(mut entry) = self.typing.get_mut(conversation_id) {
            entry.remove(user_id);
        }
    }

    pub fn active_typists(&self, conversation_id: &str) -> Vec<String> {
        let cutoff = tokio::time::Instant::now() - TYPING_TTL;
        if let Some(mut entry) = self.typing.get_mut(conversation_id) {
            entry.retain(|_, instant| *instant > cutoff);
            entry.keys().cloned().collect()
        } else {
            vec![]
        }
    }

    /// Periodic sweep dropping expired typing entries; mirrors the teacher's
    /// `cleanup_loop` cadence.
    pub async fn cleanup_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(2));
        loop {
            interval.tick().await;
            let cutoff = tokio::time::Instant::now() - TYPING_TTL;
            for mut entry in self.typing.iter_mut() {
                entry.retain(|_, instant| *instant > cutoff);
            }
            self.typing.retain(|_, v| !v.is_empty());
        }
    }
}

impl Default for PresenceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_defaults_to_offline() {
        let mgr = PresenceManager::new();
        assert_eq!(mgr.get_status("usr_1"), PresenceStatusKind::Offline);
    }

    #[test]
    fn typing_indicator_is_visible_until_it_expires() {
        let mgr = PresenceManager::new();
        mgr.start_typing("chn_1", None, "usr_1");
        assert_eq!(mgr.active_typists("chn_1"), vec!["usr_1".to_string()]);
        mgr.stop_typing("chn_1", "usr_1");
        assert!(mgr.active_typists("chn_1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_indicator_expires_on_its_own_after_the_ttl() {
        let mgr = PresenceManager::new();
        mgr.start_typing("chn_1", None, "usr_1");
        assert_eq!(mgr.active_typists("chn_1"), vec!["usr_1".to_string()]);

        tokio::time::advance(TYPING_TTL + Duration::from_millis(1)).await;
        assert!(mgr.active_typists("chn_1").is_empty());
    }
}
