//! Per-sender command rate limiting

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::infrastructure::config::MainSettings;

/// Commands counted for one sender since `last_time`
#[derive(Debug, Clone, Copy)]
pub struct ExecutedCounter {
    pub last_time: Instant,
    pub count: u32,
}

impl ExecutedCounter {
    fn new(now: Instant) -> Self {
        Self {
            last_time: now,
            count: 0,
        }
    }
}

/// Blocks senders issuing more than `max_commands` commands per `window`.
///
/// Expired counters are swept on every check rather than by a timer.
#[derive(Debug)]
pub struct RateLimiter {
    counters: HashMap<String, ExecutedCounter>,
    max_commands: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_commands: u32, window: Duration) -> Self {
        Self {
            counters: HashMap::new(),
            max_commands,
            window,
        }
    }

    pub fn from_settings(settings: &MainSettings) -> Self {
        Self::new(settings.executed_commands_per_time, settings.time_to_block)
    }

    /// Count one command for `key`; true when it must be dropped
    pub fn is_blocked(&mut self, key: &str) -> bool {
        self.is_blocked_at(key, Instant::now())
    }

    pub fn is_blocked_at(&mut self, key: &str, now: Instant) -> bool {
        let window = self.window;
        self.counters
            .retain(|_, counter| now.saturating_duration_since(counter.last_time) < window);

        let counter = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| ExecutedCounter::new(now));

        if counter.count >= self.max_commands {
            tracing::debug!("Rate limited {} ({} commands)", key, counter.count);
            return true;
        }
        counter.count += 1;
        false
    }

    /// Senders with a live counter
    pub fn active_senders(&self) -> usize {
        self.counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_threshold() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..3 {
            assert!(!limiter.is_blocked_at("bob!b@h", now));
        }
        assert!(limiter.is_blocked_at("bob!b@h", now));
        // other senders are unaffected
        assert!(!limiter.is_blocked_at("amy!a@h", now));
    }

    #[test]
    fn test_resets_after_window() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(!limiter.is_blocked_at("bob", start));
        assert!(limiter.is_blocked_at("bob", start + Duration::from_secs(9)));
        assert!(!limiter.is_blocked_at("bob", start + Duration::from_secs(11)));
    }

    #[test]
    fn test_sweeps_expired_counters() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(10));
        let start = Instant::now();

        limiter.is_blocked_at("a", start);
        limiter.is_blocked_at("b", start);
        assert_eq!(limiter.active_senders(), 2);

        limiter.is_blocked_at("c", start + Duration::from_secs(30));
        assert_eq!(limiter.active_senders(), 1);
    }
}
