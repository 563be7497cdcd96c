//! Per-email sign-in failure throttling

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tracked keys above which expired windows are swept on the next failure.
const PRUNE_THRESHOLD: usize = 1024;

/// Keys are caller-supplied emails, so the map is swept of expired windows
/// whenever it grows past `prune_at`.
#[derive(Clone)]
pub struct SignInLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
    prune_at: usize,
}

impl SignInLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
            prune_at: PRUNE_THRESHOLD,
        }
    }

    /// Record a failed attempt; returns true once the key is blocked.
    pub async fn record_failure(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        if guard.len() >= self.prune_at {
            let before = guard.len();
            guard.retain(|_, (_, reset_at)| now < *reset_at);
            tracing::debug!(
                removed = before - guard.len(),
                tracked = guard.len(),
                "Pruned expired sign-in failure windows"
            );
        }
        let (count, reset_at) = guard
            .entry(key.to_string())
            .or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    pub async fn is_blocked(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(key) {
            if Instant::now() >= *reset_at {
                guard.remove(key);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }

    /// Forget failures after a successful sign-in.
    pub async fn clear(&self, key: &str) {
        self.inner.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocks_after_max_failures() {
        let limiter = SignInLimiter::new(3, 60);
        assert!(!limiter.record_failure("a@b.com").await);
        assert!(!limiter.record_failure("a@b.com").await);
        assert!(!limiter.is_blocked("a@b.com").await);
        assert!(limiter.record_failure("a@b.com").await);
        assert!(limiter.is_blocked("a@b.com").await);
        assert!(!limiter.is_blocked("c@d.com").await);
    }

    #[tokio::test]
    async fn test_clear_resets_count() {
        let limiter = SignInLimiter::new(2, 60);
        limiter.record_failure("a@b.com").await;
        limiter.clear("a@b.com").await;
        assert!(!limiter.record_failure("a@b.com").await);
    }

    #[tokio::test]
    async fn test_expired_keys_are_evicted() {
        let mut limiter = SignInLimiter::new(5, 0);
        limiter.prune_at = 100;
        for i in 0..1000 {
            limiter.record_failure(&format!("user{}@x.com", i)).await;
            assert!(limiter.inner.lock().await.len() <= 100);
        }

        limiter.record_failure("last@x.com").await;
        let tracked = limiter.inner.lock().await.len();
        assert!(tracked <= 100, "tracked {} keys", tracked);
    }

    #[tokio::test]
    async fn test_live_windows_survive_pruning() {
        let mut limiter = SignInLimiter::new(2, 60);
        limiter.prune_at = 3;
        for key in ["a@x.com", "b@x.com", "c@x.com"] {
            limiter.record_failure(key).await;
        }
        limiter.record_failure("a@x.com").await;
        assert!(limiter.is_blocked("a@x.com").await);
        assert_eq!(limiter.inner.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_window_expiry_unblocks() {
        let limiter = SignInLimiter::new(1, 0);
        limiter.record_failure("a@b.com").await;
        assert!(!limiter.is_blocked("a@b.com").await);
    }
}
