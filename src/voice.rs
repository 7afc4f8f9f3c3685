//! Voice channel participant tracking and signaling proxy (C11, §4.11).
//!
//! The teacher runs its own QUIC/SFU media relay (`quinn`, `rcgen`, `rustls`,
//! raw Opus forwarding) in this module; that's out of scope here; this gateway
//! only tracks who's in which voice channel and forwards signaling requests to
//! an external service over HTTP, reusing the teacher's `reqwest`-based
//! `http_client` pattern (`api.rs`'s `validate_token_federated`) for the
//! forwarding call. TLS termination for that upstream is assumed external.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::VoiceConfig;
use crate::error::{AppError, AppResult};
use crate::models::VoiceSession;

pub struct VoiceRegistry {
    /// channel_id → (user_id → session)
    channels: Arc<DashMap<String, RwLock<HashMap<String, VoiceSession>>>>,
    http_client: reqwest::Client,
    config: VoiceConfig,
}

impl VoiceRegistry {
    pub fn new(config: VoiceConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            channels: Arc::new(DashMap::new()),
            http_client,
            config,
        }
    }

    pub async fn join(&self, channel_id: &str, session: VoiceSession) -> VoiceSession {
        self.channels
            .entry(channel_id.to_string())
            .or_default()
            .write()
            .await
            .insert(session.user_id.clone(), session.clone());
        session
    }

    pub async fn leave(&self, channel_id: &str, user_id: &str) {
        if let Some(entry) = self.channels.get(channel_id) {
            let mut sessions = entry.write().await;
            sessions.remove(user_id);
            let empty = sessions.is_empty();
            drop(sessions);
            if empty {
                self.channels.remove(channel_id);
            }
        }
    }

    pub async fn update_state(
        &self,
        channel_id: &str,
        user_id: &str,
        muted: Option<bool>,
        deafened: Option<bool>,
        screen_sharing: Option<bool>,
    ) -> Option<VoiceSession> {
        let entry = self.channels.get(channel_id)?;
        let mut sessions = entry.write().await;
        let session = sessions.get_mut(user_id)?;
        if let Some(m) = muted {
            session.muted = m;
        }
        if let Some(d) = deafened {
            session.deafened = d;
        }
        if let Some(s) = screen_sharing {
            session.screen_sharing = s;
        }
        Some(session.clone())
    }

    pub async fn participants(&self, channel_id: &str) -> Vec<VoiceSession> {
        match self.channels.get(channel_id) {
            Some(entry) => entry.read().await.values().cloned().collect(),
            None => vec![],
        }
    }

    /// Remove every session for `user_id` across all channels (disconnect cleanup).
    pub async fn leave_all(&self, user_id: &str) -> Vec<String> {
        let mut left = vec![];
        for entry in self.channels.iter() {
            if entry.read().await.contains_key(user_id) {
                left.push(entry.key().clone());
            }
        }
        for channel_id in &left {
            self.leave(channel_id, user_id).await;
        }
        left
    }

    /// Forward a signaling payload (SDP offer/answer, ICE candidate) to the
    /// external signaling service, per §4.11.
    pub async fn forward_signal(&self, channel_id: &str, user_id: &str, body: Value) -> AppResult<Value> {
        let url = format!(
            "{}/channels/{}/signal",
            self.config.signaling_url.trim_end_matches('/'),
            channel_id
        );
        let response = self
            .http_client
            .post(&url)
            .header("X-Mango-User-Id", user_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("voice signaling request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "voice signaling upstream returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid signaling response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(channel_id: &str, user_id: &str) -> VoiceSession {
        VoiceSession {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            server_id: None,
            muted: false,
            deafened: false,
            screen_sharing: false,
            joined_at: crate::ids::now(),
        }
    }

    #[tokio::test]
    async fn join_then_leave_empties_the_channel() {
        let registry = VoiceRegistry::new(VoiceConfig {
            signaling_url: "http://localhost:9".into(),
            request_timeout_ms: 100,
        });
        registry.join("chn_1", session("chn_1", "usr_1")).await;
        assert_eq!(registry.participants("chn_1").await.len(), 1);
        registry.leave("chn_1", "usr_1").await;
        assert!(registry.participants("chn_1").await.is_empty());
    }

    #[tokio::test]
    async fn mute_state_updates_in_place() {
        let registry = VoiceRegistry::new(VoiceConfig {
            signaling_url: "http://localhost:9".into(),
            request_timeout_ms: 100,
        });
        registry.join("chn_1", session("chn_1", "usr_1")).await;
        let updated = registry
            .update_state("chn_1", "usr_1", Some(true), None, None)
            .await
            .unwrap();
        assert!(updated.muted);
    }
}
