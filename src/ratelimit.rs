//! Fixed-window rate limiter (C7, §4.9), named rules over a `DashMap` bucket
//! index — the same concurrent-map idiom the teacher uses for presence state
//! (`presence.rs`), applied here to per-user/per-rule request counting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    window: Duration,
    limit: u32,
    buckets: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            window,
            limit,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Check and consume one slot for `key` (e.g. `"{rule}:{user_id}"`).
    /// Returns `true` if the request is allowed under the current window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.buckets.entry(key.to_string()).or_insert_with(|| Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            false
        } else {
            entry.count += 1;
            true
        }
    }

    /// Spawn a background task that periodically evicts expired windows.
    /// Takes `&self` rather than `Arc<Self>`: the bucket map is already
    /// `Arc`-backed, so the spawned task only needs to clone that handle.
    pub fn spawn_cleanup(&self) {
        let buckets = self.buckets.clone();
        let window = self.window;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(window);
            loop {
                interval.tick().await;
                let cutoff = Instant::now() - window;
                buckets.retain(|_, w| w.started_at > cutoff);
            }
        });
    }
}

/// Named rules (§4.9): each guards a distinct action with its own bucket
/// namespace so a burst on one doesn't starve another.
pub struct RateLimiters {
    pub auth: RateLimiter,
    pub messages: RateLimiter,
    pub typing: RateLimiter,
    pub reactions: RateLimiter,
    pub friend_requests: RateLimiter,
    pub invites: RateLimiter,
    pub default: RateLimiter,
}

impl RateLimiters {
    pub fn new(messages_per_window: u32, window: Duration) -> Self {
        Self {
            auth: RateLimiter::new(15, Duration::from_secs(60)),
            messages: RateLimiter::new(messages_per_window, window),
            typing: RateLimiter::new(60, Duration::from_secs(10)),
            reactions: RateLimiter::new(40, Duration::from_secs(10)),
            friend_requests: RateLimiter::new(5, Duration::from_secs(60)),
            invites: RateLimiter::new(10, Duration::from_secs(60)),
            default: RateLimiter::new(300, Duration::from_secs(60)),
        }
    }

    /// Spawn the periodic eviction task for every named rule.
    pub fn spawn_cleanup_tasks(&self) {
        self.auth.spawn_cleanup();
        self.messages.spawn_cleanup();
        self.typing.spawn_cleanup();
        self.reactions.spawn_cleanup();
        self.friend_requests.spawn_cleanup();
        self.invites.spawn_cleanup();
        self.default.spawn_cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        assert!(limiter.check("usr_1"));
        assert!(limiter.check("usr_1"));
        assert!(!limiter.check("usr_1"));
    }

    #[test]
    fn buckets_are_independent_per_key() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.check("usr_1"));
        assert!(limiter.check("usr_2"));
    }
}
