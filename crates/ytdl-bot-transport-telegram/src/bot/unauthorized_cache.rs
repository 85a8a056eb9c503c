//! Unauthorized access flood protection
//!
//! Users outside the allowlist get the "Access denied" reply at most once per
//! cooldown; repeated attempts are counted and only sampled into the log.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Log every Nth silenced attempt
const SILENCED_LOG_EVERY: u64 = 100;

/// Remembers who was recently told "Access denied"
#[derive(Clone)]
pub struct UnauthorizedCache {
    /// user_id -> () while the user is inside their cooldown window
    notified: Cache<i64, ()>,
    cooldown: Duration,
    silenced_count: Arc<AtomicU64>,
}

impl UnauthorizedCache {
    /// Creates a cache whose entries expire after `cooldown_secs`
    ///
    /// # Examples
    ///
    /// ```
    /// use ytdl_bot_transport_telegram::bot::UnauthorizedCache;
    ///
    /// let cache = UnauthorizedCache::new(1200, 10_000);
    /// assert_eq!(cache.cooldown().as_secs(), 1200);
    /// ```
    #[must_use]
    pub fn new(cooldown_secs: u64, max_capacity: u64) -> Self {
        let cooldown = Duration::from_secs(cooldown_secs);
        let notified = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(cooldown)
            .build();

        Self {
            notified,
            cooldown,
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a denial message should go out to `user_id` now
    #[must_use]
    pub fn should_send(&self, user_id: i64, user_name: &str) -> bool {
        if !self.notified.contains_key(&user_id) {
            return true;
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(SILENCED_LOG_EVERY) {
            debug!(count, user_id, user_name, "Silenced unauthorized attempts");
        }
        false
    }

    /// Start the cooldown for `user_id` after a denial was delivered
    pub async fn mark_sent(&self, user_id: i64) {
        self.notified.insert(user_id, ()).await;
    }

    /// Total number of silenced attempts
    #[must_use]
    pub fn silenced_count(&self) -> u64 {
        self.silenced_count.load(Ordering::Relaxed)
    }

    /// Configured cooldown
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_attempt_is_answered_then_silenced() {
        let cache = UnauthorizedCache::new(60, 100);

        assert!(cache.should_send(12345, "Stranger"));
        cache.mark_sent(12345).await;
        assert!(!cache.should_send(12345, "Stranger"));
        assert!(cache.should_send(999, "Other"));
    }

    #[tokio::test]
    async fn test_silenced_attempts_are_counted() {
        let cache = UnauthorizedCache::new(60, 100);
        cache.mark_sent(1).await;

        for _ in 0..5 {
            let _ = cache.should_send(1, "Stranger");
        }
        assert_eq!(cache.silenced_count(), 5);
    }

    #[tokio::test]
    async fn test_cooldown_expires() {
        let cache = UnauthorizedCache::new(1, 100);
        cache.mark_sent(7).await;
        assert!(!cache.should_send(7, "Stranger"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.should_send(7, "Stranger"));
    }
}
