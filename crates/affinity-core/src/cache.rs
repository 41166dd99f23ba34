//! Recommendation cache
//!
//! Finished recommendation lists are memoised per kind, subject and request
//! parameters. The backend is a plain key/value store with expiry; the
//! [`RecommendationCache`] wrapper owns key layout, serialisation, TTL and
//! invalidation, and never lets a backend failure reach the caller.

use crate::{types::*, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Key prefix shared by every recommendation entry
pub const KEY_PREFIX: &str = "recommend";

/// Key/value store with expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key matching a glob pattern (`*` wildcard); returns the count
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process backend; expired entries are dropped lazily
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry count
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok(before - entries.len())
    }
}

/// Match `text` against a pattern where `*` matches any run of characters
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == b'*')
}

/// Cache key: `recommend:{kind}:{subject}:{name}={value}:...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    kind: RecommendationKind,
    subject: i64,
    params: Vec<(&'static str, String)>,
}

impl CacheKey {
    pub fn new(kind: RecommendationKind, subject: i64) -> Self {
        Self {
            kind,
            subject,
            params: Vec::new(),
        }
    }

    /// Append a request parameter
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    /// Pattern covering every entry of one kind for one subject
    pub fn subject_pattern(kind: RecommendationKind, subject: i64) -> String {
        format!("{KEY_PREFIX}:{kind}:{subject}:*")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEY_PREFIX}:{}:{}", self.kind, self.subject)?;
        for (name, value) in &self.params {
            write!(f, ":{name}={value}")?;
        }
        Ok(())
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Typed, fault-tolerant view over a [`CacheBackend`]
pub struct RecommendationCache {
    backend: Arc<dyn CacheBackend>,
    enabled: bool,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecommendationCache {
    pub fn new(backend: Arc<dyn CacheBackend>, enabled: bool, ttl: Duration) -> Self {
        Self {
            backend,
            enabled,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Cached list for `key`; `None` on miss, when disabled, or on any failure
    pub async fn get<K: DeserializeOwned>(&self, key: &CacheKey) -> Option<Vec<Scored<K>>> {
        if !self.enabled {
            return None;
        }

        let key = key.to_string();
        let raw = match self.backend.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                None
            }
        };

        let decoded = raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        });

        if decoded.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        decoded
    }

    /// Store a list under `key` with the configured TTL
    pub async fn put<K: Serialize>(&self, key: &CacheKey, list: &[Scored<K>]) {
        if !self.enabled {
            return;
        }

        let key = key.to_string();
        let json = match serde_json::to_string(list) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache encode failed");
                return;
            }
        };
        if let Err(e) = self.backend.set(&key, json, self.ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    /// Drop one entry; true when something was removed
    pub async fn remove(&self, key: &CacheKey) -> bool {
        if !self.enabled {
            return false;
        }

        let key = key.to_string();
        match self.backend.delete(&key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Drop every recommendation entry
    pub async fn invalidate_all(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.delete_pattern(&format!("{KEY_PREFIX}:*")).await
    }

    /// Drop the user-keyed entries of one user
    pub async fn invalidate_user(&self, user: UserId) -> usize {
        if !self.enabled {
            return 0;
        }

        let mut removed = 0;
        let kinds = [
            RecommendationKind::Posts,
            RecommendationKind::Similar,
            RecommendationKind::Users,
        ];
        for kind in kinds.into_iter().filter(RecommendationKind::is_user_keyed) {
            removed += self
                .delete_pattern(&CacheKey::subject_pattern(kind, user.0))
                .await;
        }
        debug!(user = %user, removed, "User cache invalidated");
        removed
    }

    async fn delete_pattern(&self, pattern: &str) -> usize {
        match self.backend.delete_by_pattern(pattern).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache invalidation failed");
                0
            }
        }
    }
}

impl fmt::Debug for RecommendationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationCache")
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Cache("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            Err(Error::Cache("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<bool> {
            Err(Error::Cache("connection refused".into()))
        }

        async fn delete_by_pattern(&self, _pattern: &str) -> Result<usize> {
            Err(Error::Cache("connection refused".into()))
        }
    }

    fn items(ids: &[i64]) -> Vec<ScoredItem> {
        ids.iter().map(|&id| ScoredItem::new(ItemId(id), id as f64 * 0.25)).collect()
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("recommend:*", "recommend:posts:1:limit=10"));
        assert!(glob_match("recommend:posts:1:*", "recommend:posts:1:limit=10"));
        assert!(!glob_match("recommend:posts:1:*", "recommend:posts:12:limit=10"));
        assert!(glob_match("*:users:*", "recommend:users:3:limit=5"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
        assert!(glob_match("a*b*c", "aXXbYYc"));
        assert!(!glob_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::new(RecommendationKind::Posts, 7)
            .param("limit", 10)
            .param("exclude_seen", true);
        assert_eq!(key.to_string(), "recommend:posts:7:limit=10:exclude_seen=true");
        assert!(glob_match(
            &CacheKey::subject_pattern(RecommendationKind::Posts, 7),
            &key.to_string()
        ));
    }

    #[tokio::test]
    async fn test_memory_cache_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), Duration::from_millis(50)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_by_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        for key in ["recommend:posts:1:limit=5", "recommend:posts:2:limit=5", "other:1"] {
            cache.set(key, "[]".into(), ttl).await.unwrap();
        }

        assert_eq!(cache.delete_by_pattern("recommend:*").await.unwrap(), 2);
        assert_eq!(cache.len().await, 1);
        assert!(cache.delete("other:1").await.unwrap());
        assert!(!cache.delete("other:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_recommendation_cache_roundtrip() {
        let cache = RecommendationCache::new(Arc::new(MemoryCache::new()), true, Duration::from_secs(60));
        let key = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 3);

        assert!(cache.get::<ItemId>(&key).await.is_none());
        cache.put(&key, &items(&[1, 2, 3])).await;
        assert_eq!(cache.get::<ItemId>(&key).await, Some(items(&[1, 2, 3])));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        assert!(cache.remove(&key).await);
        assert!(!cache.remove(&key).await);
        assert!(cache.get::<ItemId>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_user() {
        let cache = RecommendationCache::new(Arc::new(MemoryCache::new()), true, Duration::from_secs(60));
        let posts = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 3);
        let users = CacheKey::new(RecommendationKind::Users, 1).param("limit", 3);
        let similar = CacheKey::new(RecommendationKind::Similar, 1).param("limit", 3);
        let other = CacheKey::new(RecommendationKind::Posts, 2).param("limit", 3);
        for key in [&posts, &users, &similar, &other] {
            cache.put(key, &items(&[5])).await;
        }

        assert_eq!(cache.invalidate_user(UserId(1)).await, 2);
        assert!(cache.get::<ItemId>(&posts).await.is_none());
        assert!(cache.get::<UserId>(&users).await.is_none());
        // Item-keyed and other users' entries survive
        assert!(cache.get::<ItemId>(&similar).await.is_some());
        assert!(cache.get::<ItemId>(&other).await.is_some());

        assert_eq!(cache.invalidate_all().await, 2);
        assert!(cache.get::<ItemId>(&similar).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let backend = Arc::new(MemoryCache::new());
        let cache = RecommendationCache::new(backend.clone(), false, Duration::from_secs(60));
        let key = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 3);

        cache.put(&key, &items(&[1])).await;
        assert!(backend.is_empty().await);
        assert!(cache.get::<ItemId>(&key).await.is_none());
        assert_eq!(cache.invalidate_all().await, 0);
    }

    #[tokio::test]
    async fn test_backend_failures_are_swallowed() {
        let cache = RecommendationCache::new(Arc::new(BrokenBackend), true, Duration::from_secs(60));
        let key = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 3);

        cache.put(&key, &items(&[1])).await;
        assert!(cache.get::<ItemId>(&key).await.is_none());
        assert_eq!(cache.invalidate_all().await, 0);
        assert_eq!(cache.invalidate_user(UserId(1)).await, 0);
        assert!(!cache.remove(&key).await);
    }
}
