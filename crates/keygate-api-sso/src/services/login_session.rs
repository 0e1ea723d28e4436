//! Pending login attempts.
//!
//! Binds a callback to the login attempt that started it: the random
//! `state`, the PKCE verifier and the redirect URI are kept here, keyed by a
//! session id the browser carries in a cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use keygate_core::{LoginSessionId, ProviderId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::error::{SsoError, SsoResult};

/// Default lifetime of a pending login (10 minutes).
pub const DEFAULT_LOGIN_SESSION_TTL: Duration = Duration::from_secs(600);

/// Default upper bound on pending logins held at once.
pub const DEFAULT_MAX_PENDING_LOGINS: usize = 10_000;

/// Data recorded when a login is initiated.
#[derive(Debug, Clone)]
pub struct NewPendingLogin {
    pub state: String,
    pub pkce_verifier: String,
    pub redirect_uri: String,
    pub provider_id: ProviderId,
}

/// A login attempt waiting for its callback.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub id: LoginSessionId,
    pub state: String,
    pub pkce_verifier: String,
    pub redirect_uri: String,
    pub provider_id: ProviderId,
    created_at: Instant,
}

impl PendingLogin {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// In-memory store of pending logins with TTL.
///
/// Bounded: once `capacity` entries are held, expired entries are dropped
/// and, if that frees nothing, the oldest pending login is evicted.
#[derive(Clone)]
pub struct LoginSessionStore {
    sessions: Arc<RwLock<HashMap<LoginSessionId, PendingLogin>>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for LoginSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_SESSION_TTL)
    }
}

impl LoginSessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_PENDING_LOGINS)
    }

    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a new pending login and return its id.
    pub async fn insert(&self, login: NewPendingLogin) -> LoginSessionId {
        let id = LoginSessionId::new();
        let pending = PendingLogin {
            id,
            state: login.state,
            pkce_verifier: login.pkce_verifier,
            redirect_uri: login.redirect_uri,
            provider_id: login.provider_id,
            created_at: Instant::now(),
        };
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.capacity {
            sessions.retain(|_, pending| !pending.is_expired(self.ttl));
        }
        if sessions.len() >= self.capacity {
            let oldest = sessions
                .values()
                .min_by_key(|pending| pending.created_at)
                .map(|pending| pending.id);
            if let Some(oldest) = oldest {
                warn!(
                    capacity = self.capacity,
                    evicted = %oldest,
                    "Pending login limit reached, evicting oldest"
                );
                sessions.remove(&oldest);
            }
        }
        sessions.insert(id, pending);
        id
    }

    /// Remove and return a pending login. Each session can be consumed once.
    #[instrument(skip(self))]
    pub async fn consume(&self, id: LoginSessionId) -> SsoResult<PendingLogin> {
        let pending = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SsoError::LoginSessionNotFound)?;

        if pending.is_expired(self.ttl) {
            debug!(session_id = %id, "Login session expired");
            return Err(SsoError::LoginSessionExpired);
        }

        Ok(pending)
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, pending| !pending.is_expired(self.ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired login sessions");
        }
        removed
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> NewPendingLogin {
        NewPendingLogin {
            state: "s".into(),
            pkce_verifier: "v".into(),
            redirect_uri: "http://example.com/callback".into(),
            provider_id: ProviderId::new(),
        }
    }

    #[tokio::test]
    async fn test_consume_once() {
        let store = LoginSessionStore::default();
        let id = store.insert(pending()).await;

        let login = store.consume(id).await.unwrap();
        assert_eq!(login.state, "s");
        assert_eq!(login.id, id);

        assert!(matches!(
            store.consume(id).await,
            Err(SsoError::LoginSessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = LoginSessionStore::default();
        assert!(matches!(
            store.consume(LoginSessionId::new()).await,
            Err(SsoError::LoginSessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_session() {
        let store = LoginSessionStore::new(Duration::ZERO);
        let id = store.insert(pending()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(matches!(
            store.consume(id).await,
            Err(SsoError::LoginSessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = LoginSessionStore::new(Duration::ZERO);
        store.insert(pending()).await;
        store.insert(pending()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_store_evicts_oldest() {
        let store = LoginSessionStore::with_capacity(DEFAULT_LOGIN_SESSION_TTL, 2);
        let first = store.insert(pending()).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = store.insert(pending()).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let third = store.insert(pending()).await;

        assert!(matches!(
            store.consume(first).await,
            Err(SsoError::LoginSessionNotFound)
        ));
        assert!(store.consume(second).await.is_ok());
        assert!(store.consume(third).await.is_ok());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_store_drops_expired_before_evicting() {
        let store = LoginSessionStore::with_capacity(Duration::from_millis(20), 2);
        store.insert(pending()).await;
        store.insert(pending()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let fresh = store.insert(pending()).await;
        assert_eq!(store.purge_expired().await, 0);
        assert!(store.consume(fresh).await.is_ok());
        assert!(store.is_empty().await);
    }
}
