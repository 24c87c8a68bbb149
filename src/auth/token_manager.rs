use std::future::Future;
use std::time::{Duration, SystemTime};

use async_lock::Mutex;

use crate::error::FirestoreResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: SystemTime,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: SystemTime) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Builds a token that expires `expires_in` after `issued_at`.
    pub fn expiring_in(token: impl Into<String>, issued_at: SystemTime, expires_in: Duration) -> Self {
        let expires_at = issued_at.checked_add(expires_in).unwrap_or(issued_at);
        Self::new(token, expires_at)
    }

    /// True while `now` is more than `skew` before expiry.
    pub fn is_fresh(&self, now: SystemTime, skew: Duration) -> bool {
        match now.checked_add(skew) {
            Some(threshold) => threshold < self.expires_at,
            None => false,
        }
    }
}

/// Single-slot token cache. The lock is held across a refresh, so concurrent
/// callers wait for the in-flight exchange instead of starting their own.
#[derive(Debug)]
pub struct TokenManager {
    state: Mutex<Option<AccessToken>>,
    skew: Duration,
}

impl TokenManager {
    pub fn new(skew: Duration) -> Self {
        Self {
            state: Mutex::new(None),
            skew,
        }
    }

    /// Returns the cached token if still fresh, otherwise awaits `refresh`
    /// and caches its result. A failed refresh leaves the slot unchanged.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> FirestoreResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FirestoreResult<AccessToken>>,
    {
        let mut state = self.state.lock().await;
        if let Some(token) = state.as_ref() {
            if token.is_fresh(SystemTime::now(), self.skew) {
                return Ok(token.token.clone());
            }
        }
        let token = refresh().await?;
        let value = token.token.clone();
        *state = Some(token);
        Ok(value)
    }

    pub async fn cached(&self) -> Option<AccessToken> {
        self.state.lock().await.clone()
    }

    pub async fn clear(&self) {
        *self.state.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn freshness_respects_skew() {
        let now = SystemTime::now();
        let token = AccessToken::expiring_in("t", now, Duration::from_secs(120));
        assert!(token.is_fresh(now, Duration::from_secs(60)));
        assert!(!token.is_fresh(now + Duration::from_secs(61), Duration::from_secs(60)));

        let short = AccessToken::expiring_in("t", now, Duration::from_secs(30));
        assert!(!short.is_fresh(now, Duration::from_secs(60)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reuses_fresh_token() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let token = manager
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken::expiring_in(
                        "fresh",
                        SystemTime::now(),
                        Duration::from_secs(3600),
                    ))
                })
                .await
                .unwrap();
            assert_eq!(token, "fresh");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refreshes_when_inside_skew() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            manager
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken::expiring_in(
                        "short",
                        SystemTime::now(),
                        Duration::from_secs(30),
                    ))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_refresh_keeps_slot_empty() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let result = manager
            .get_or_refresh(|| async { Err(crate::error::auth_error("denied")) })
            .await;
        assert!(result.is_err());
        assert!(manager.cached().await.is_none());
    }
}
