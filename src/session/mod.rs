/*!
 * Admin sessions
 * Server-side session records behind an opaque cookie token. Records are
 * keyed by the SHA-256 digest of the token so a leaked store dump cannot be
 * replayed as cookies.
 */
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, TimeDelta, Utc};
use cookie::{Cookie, SameSite};
use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::db::models::AdminSummary;

pub const SESSION_COOKIE: &str = "portfolio.sid";
const TOKEN_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub admin: AdminSummary,
    pub expires_at: DateTime<Utc>,
}

/// Backing map for sessions. Keys are token digests, never raw tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<SessionRecord>;
    async fn set(&self, key: String, record: SessionRecord);
    async fn expire(&self, key: &str);
    /// Push a live record's expiry to `now + ttl` in one step. Missing or
    /// expired records yield `None`, and an expired one is removed.
    async fn touch(&self, key: &str, now: DateTime<Utc>, ttl: TimeDelta) -> Option<SessionRecord>;
    /// Drop every record expired at `now`; returns how many were removed.
    async fn sweep(&self, now: DateTime<Utc>) -> usize;
}

#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Option<SessionRecord> {
        self.records.read().await.get(key).cloned()
    }

    async fn set(&self, key: String, record: SessionRecord) {
        self.records.write().await.insert(key, record);
    }

    async fn expire(&self, key: &str) {
        self.records.write().await.remove(key);
    }

    async fn touch(&self, key: &str, now: DateTime<Utc>, ttl: TimeDelta) -> Option<SessionRecord> {
        let mut records = self.records.write().await;
        if records.get(key)?.expires_at <= now {
            records.remove(key);
            return None;
        }
        let record = records.get_mut(key)?;
        record.expires_at = now + ttl;
        Some(record.clone())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        before - records.len()
    }
}

fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LEN)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Session token from the request's `Cookie` header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` header value for a cookie.
pub fn set_cookie_value(cookie: &Cookie<'_>) -> Result<HeaderValue, header::InvalidHeaderValue> {
    HeaderValue::from_str(&cookie.to_string())
}

/// Issues, resolves and ends admin sessions with a sliding TTL.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    ttl: TimeDelta,
    secure: bool,
}

impl Sessions {
    pub fn new(store: Arc<dyn SessionStore>, ttl: std::time::Duration, secure: bool) -> Self {
        Self {
            store,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::days(1)),
            secure,
        }
    }

    pub fn in_memory(ttl: std::time::Duration, secure: bool) -> Self {
        Self::new(Arc::new(MemorySessionStore::new()), ttl, secure)
    }

    /// Open a session for `admin` and return its token. Any session carried
    /// by `previous` is ended first, so login always rotates the id.
    pub async fn start(&self, admin: AdminSummary, previous: Option<&str>) -> String {
        if let Some(previous) = previous {
            self.end(previous).await;
        }

        let token = generate_token();
        self.store
            .set(
                hash_token(&token),
                SessionRecord {
                    admin,
                    expires_at: Utc::now() + self.ttl,
                },
            )
            .await;
        token
    }

    /// The admin behind `token`. A live session has its expiry pushed forward.
    pub async fn resolve(&self, token: &str) -> Option<AdminSummary> {
        self.store
            .touch(&hash_token(token), Utc::now(), self.ttl)
            .await
            .map(|record| record.admin)
    }

    pub async fn end(&self, token: &str) {
        self.store.expire(&hash_token(token)).await;
    }

    pub async fn sweep(&self) -> usize {
        self.store.sweep(Utc::now()).await
    }

    pub fn cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    pub fn clear_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.cookie("");
        cookie.make_removal();
        cookie
    }

    /// Periodically drop expired records until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sessions.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired admin sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn admin() -> AdminSummary {
        AdminSummary {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_then_resolve() {
        let sessions = Sessions::in_memory(Duration::from_secs(60), false);
        let who = admin();
        let token = sessions.start(who.clone(), None).await;
        assert_eq!(token.len(), 64);
        assert_eq!(sessions.resolve(&token).await, Some(who));
        assert_eq!(sessions.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn test_store_is_keyed_by_digest() {
        let store = Arc::new(MemorySessionStore::new());
        let sessions = Sessions::new(store.clone(), Duration::from_secs(60), false);
        let token = sessions.start(admin(), None).await;

        assert!(store.get(&token).await.is_none());
        assert!(store.get(&hash_token(&token)).await.is_some());
    }

    #[tokio::test]
    async fn test_resolve_slides_expiry() {
        let store = Arc::new(MemorySessionStore::new());
        let sessions = Sessions::new(store.clone(), Duration::from_secs(60), false);
        let token = sessions.start(admin(), None).await;
        let key = hash_token(&token);
        let first = store.get(&key).await.unwrap().expires_at;

        tokio::time::sleep(Duration::from_millis(5)).await;
        sessions.resolve(&token).await.unwrap();
        let second = store.get(&key).await.unwrap().expires_at;
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let store = Arc::new(MemorySessionStore::new());
        let sessions = Sessions::new(store.clone(), Duration::ZERO, false);
        let token = sessions.start(admin(), None).await;

        assert_eq!(sessions.resolve(&token).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_login_rotates_and_logout_ends() {
        let sessions = Sessions::in_memory(Duration::from_secs(60), false);
        let old = sessions.start(admin(), None).await;
        let new = sessions.start(admin(), Some(&old)).await;

        assert_ne!(old, new);
        assert!(sessions.resolve(&old).await.is_none());
        assert!(sessions.resolve(&new).await.is_some());

        sessions.end(&new).await;
        assert!(sessions.resolve(&new).await.is_none());
    }

    /// Delays `touch` so an `end` can land while a resolve is in flight.
    struct DelayedTouch {
        inner: MemorySessionStore,
        delay: Duration,
    }

    #[async_trait]
    impl SessionStore for DelayedTouch {
        async fn get(&self, key: &str) -> Option<SessionRecord> {
            self.inner.get(key).await
        }

        async fn set(&self, key: String, record: SessionRecord) {
            self.inner.set(key, record).await
        }

        async fn expire(&self, key: &str) {
            self.inner.expire(key).await
        }

        async fn touch(&self, key: &str, now: DateTime<Utc>, ttl: TimeDelta) -> Option<SessionRecord> {
            tokio::time::sleep(self.delay).await;
            self.inner.touch(key, now, ttl).await
        }

        async fn sweep(&self, now: DateTime<Utc>) -> usize {
            self.inner.sweep(now).await
        }
    }

    #[tokio::test]
    async fn test_logout_during_resolve_stays_logged_out() {
        let store = Arc::new(DelayedTouch {
            inner: MemorySessionStore::new(),
            delay: Duration::from_millis(50),
        });
        let sessions = Sessions::new(store.clone(), Duration::from_secs(60), false);
        let token = sessions.start(admin(), None).await;

        let in_flight = {
            let sessions = sessions.clone();
            let token = token.clone();
            tokio::spawn(async move { sessions.resolve(&token).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        sessions.end(&token).await;

        assert_eq!(in_flight.await.unwrap(), None);
        assert_eq!(sessions.resolve(&token).await, None);
        assert_eq!(store.inner.len().await, 0);
    }

    #[tokio::test]
    async fn test_touch_ignores_missing_records() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        assert!(store.touch("gone", now, TimeDelta::seconds(60)).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = Arc::new(MemorySessionStore::new());
        let live = Sessions::new(store.clone(), Duration::from_secs(60), false);
        let dead = Sessions::new(store.clone(), Duration::ZERO, false);
        live.start(admin(), None).await;
        dead.start(admin(), None).await;

        assert_eq!(live.sweep().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_cookie_attributes() {
        let sessions = Sessions::in_memory(Duration::from_secs(3600), true);
        let rendered = sessions.cookie("abc").to_string();
        assert!(rendered.starts_with("portfolio.sid=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=3600"));

        let insecure = Sessions::in_memory(Duration::from_secs(3600), false);
        assert!(!insecure.cookie("abc").to_string().contains("Secure"));

        let cleared = sessions.clear_cookie().to_string();
        assert!(cleared.starts_with("portfolio.sid=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; portfolio.sid=tok123; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("portfolio.sid="));
        assert_eq!(token_from_headers(&headers), None);
    }
}
