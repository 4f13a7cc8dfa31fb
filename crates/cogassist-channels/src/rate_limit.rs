//! Per-client receive-side rate limiting: N messages per rolling window.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub struct RateLimiter {
    max_messages: u32,
    window: Duration,
    history: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(max_messages: u32, window_secs: u64) -> Self {
        Self {
            max_messages,
            window: Duration::seconds(window_secs as i64),
            history: DashMap::new(),
        }
    }

    /// Record one inbound message for `client_id`. Returns `true` if it is
    /// within the limit, `false` if it should be rejected.
    pub fn check(&self, client_id: &str) -> bool {
        let now = Utc::now();
        let mut entry = self.history.entry(client_id.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now - *front > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() as u32 >= self.max_messages {
            return false;
        }
        entry.push_back(now);
        true
    }

    pub fn forget(&self, client_id: &str) {
        self.history.remove(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_configured_limit() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.check("c1"));
        assert!(limiter.check("c1"));
        assert!(limiter.check("c1"));
        assert!(!limiter.check("c1"));
    }

    #[test]
    fn clients_are_tracked_independently() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("c1"));
        assert!(limiter.check("c2"));
        assert!(!limiter.check("c1"));
    }

    #[test]
    fn forget_clears_a_clients_history() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("c1"));
        limiter.forget("c1");
        assert!(limiter.check("c1"));
    }
}
