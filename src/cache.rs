//! TTL cache for the negotiated API version and the handshake snapshot.
//!
//! The store is pluggable so several processes can share one backend. Callers
//! treat every [`CacheError`] as a miss: log it and fetch from the core.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// An in-memory copy of a cached value, valid until its TTL elapses.
#[derive(Debug, Clone)]
pub(crate) struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    pub(crate) fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// The value, unless its TTL has elapsed.
    pub(crate) fn fresh(&self) -> Option<&T> {
        match self.expires_at {
            Some(deadline) if Instant::now() >= deadline => None,
            _ => Some(&self.value),
        }
    }

    pub(crate) fn value(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`CacheStore`], the default for a context.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, CachedValue>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        let inner = Cache::builder()
            .max_capacity(1_000)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner
            .insert(key.to_string(), CachedValue { value, ttl })
            .await;
        Ok(())
    }
}
