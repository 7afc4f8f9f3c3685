//! Shared application state (§5), grounded on the teacher's `AppState`
//! (`api.rs`) — a single `Clone`-cheap struct of `Arc`-wrapped subsystems
//! threaded through every handler and the WebSocket front via axum's
//! `State` extractor.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::hub::Hub;
use crate::presence::PresenceManager;
use crate::ratelimit::RateLimiters;
use crate::store::Store;
use crate::voice::VoiceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hub: Arc<Hub>,
    pub presence: Arc<PresenceManager>,
    pub rate_limiters: Arc<RateLimiters>,
    pub voice: Arc<VoiceRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let rate_limiters = RateLimiters::new(
            config.rate_limit.messages_per_window,
            std::time::Duration::from_millis(config.rate_limit.window_ms),
        );
        let voice = VoiceRegistry::new(config.voice.clone());
        Self {
            store,
            hub: Arc::new(Hub::new()),
            presence: Arc::new(PresenceManager::new()),
            rate_limiters: Arc::new(rate_limiters),
            voice: Arc::new(voice),
            config: Arc::new(config),
        }
    }
}
