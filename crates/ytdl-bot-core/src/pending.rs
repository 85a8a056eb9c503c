//! Pending download requests keyed by conversation.
//!
//! Holds the link a user submitted until they pick a format. Entries live in
//! memory only and expire after an idle TTL; a restart simply forgets them.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// A link waiting for a format choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Submitted link
    pub url: String,
    /// When the link was submitted
    pub created_at: DateTime<Utc>,
}

/// Concurrent store of at most one pending request per conversation
#[derive(Clone)]
pub struct PendingRequests {
    /// conversation id -> pending request, evicted after TTL
    cache: Cache<i64, PendingRequest>,
}

impl PendingRequests {
    /// Creates a store whose entries expire after `ttl`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use ytdl_bot_core::pending::PendingRequests;
    ///
    /// let pending = PendingRequests::new(Duration::from_secs(3600), 10_000);
    /// ```
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(ttl)
            .build();

        Self { cache }
    }

    /// Stores `url` for the conversation, replacing any earlier link
    pub async fn put(&self, conversation_id: i64, url: impl Into<String>) {
        let request = PendingRequest {
            url: url.into(),
            created_at: Utc::now(),
        };
        debug!(conversation_id, url = %request.url, "Stored pending request");
        self.cache.insert(conversation_id, request).await;
    }

    /// Removes and returns the pending request, if any.
    ///
    /// The removal is atomic per key, so a duplicated selection event
    /// never sees the same request twice.
    pub async fn take(&self, conversation_id: i64) -> Option<PendingRequest> {
        self.cache.remove(&conversation_id).await
    }

    /// Removes and returns the pending link, if any
    pub async fn take_url(&self, conversation_id: i64) -> Option<String> {
        self.take(conversation_id).await.map(|request| request.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> PendingRequests {
        PendingRequests::new(Duration::from_secs(60), 100)
    }

    #[tokio::test]
    async fn test_take_returns_url_once() {
        let pending = store();
        pending.put(1, "https://youtu.be/dQw4w9WgXcQ").await;

        assert_eq!(
            pending.take_url(1).await.as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
        assert_eq!(pending.take_url(1).await, None);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_link() {
        let pending = store();
        pending.put(1, "https://youtu.be/aaaaaaaaaaa").await;
        pending.put(1, "https://youtu.be/bbbbbbbbbbb").await;

        assert_eq!(
            pending.take_url(1).await.as_deref(),
            Some("https://youtu.be/bbbbbbbbbbb")
        );
        assert_eq!(pending.take_url(1).await, None);
    }

    #[tokio::test]
    async fn test_take_without_put_is_empty() {
        let pending = store();
        assert!(pending.take(42).await.is_none());
    }

    #[tokio::test]
    async fn test_created_at_is_recorded() {
        let pending = store();
        let before = Utc::now();
        pending.put(7, "https://youtu.be/dQw4w9WgXcQ").await;

        let request = pending.take(7).await;
        assert!(request.is_some_and(|r| r.created_at >= before));
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let pending = Arc::new(store());

        let mut handles = Vec::new();
        for id in 0..32_i64 {
            let pending = pending.clone();
            handles.push(tokio::spawn(async move {
                pending.put(id, format!("https://youtu.be/video{id:06}")).await;
                pending.take_url(id).await
            }));
        }

        for (id, handle) in handles.into_iter().enumerate() {
            let url = handle.await.ok().flatten();
            assert_eq!(url, Some(format!("https://youtu.be/video{id:06}")));
        }
    }

    #[tokio::test]
    async fn test_concurrent_takes_yield_single_winner() {
        let pending = Arc::new(store());
        pending.put(5, "https://youtu.be/dQw4w9WgXcQ").await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pending = pending.clone();
            handles.push(tokio::spawn(async move { pending.take_url(5).await }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.ok().flatten().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
