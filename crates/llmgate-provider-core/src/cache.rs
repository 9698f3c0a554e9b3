//! Namespaced key/value cache with per-entry TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::EndpointTokenConfig;

/// Namespace holding fetched [`EndpointTokenConfig`] values.
pub const TOKEN_CONFIG_NAMESPACE: &str = "tokenConfig";

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value>;
    /// `ttl: None` keeps the entry until overwritten.
    async fn set(&self, namespace: &str, key: &str, value: Value, ttl: Option<Duration>);
    async fn delete(&self, namespace: &str, key: &str);
}

type CacheKey = (String, String);

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-wide in-memory cache. Writes for one key replace the entry atomically.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let cache_key = (namespace.to_string(), key.to_string());
        let now = Instant::now();
        {
            let guard = self.entries.read().await;
            match guard.get(&cache_key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Re-check under the write lock; a concurrent `set` may have refreshed it.
        let mut guard = self.entries.write().await;
        if guard
            .get(&cache_key)
            .is_some_and(|entry| !entry.is_live(Instant::now()))
        {
            guard.remove(&cache_key);
        }
        None
    }

    async fn set(&self, namespace: &str, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| entry.is_live(now));
        guard.insert((namespace.to_string(), key.to_string()), entry);
    }

    async fn delete(&self, namespace: &str, key: &str) {
        self.entries
            .write()
            .await
            .remove(&(namespace.to_string(), key.to_string()));
    }
}

/// Typed view over the token-config namespace of a shared [`Cache`].
#[derive(Clone)]
pub struct TokenConfigStore {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl TokenConfigStore {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, token_key: &str) -> Option<EndpointTokenConfig> {
        let value = self.cache.get(TOKEN_CONFIG_NAMESPACE, token_key).await?;
        match serde_json::from_value(value) {
            Ok(config) => {
                debug!(event = "token_config_cache_hit", token_key = %token_key);
                Some(config)
            }
            Err(err) => {
                warn!(
                    event = "token_config_cache_decode_failed",
                    token_key = %token_key,
                    error = %err
                );
                None
            }
        }
    }

    pub async fn set(&self, token_key: &str, config: &EndpointTokenConfig) {
        match serde_json::to_value(config) {
            Ok(value) => {
                self.cache
                    .set(TOKEN_CONFIG_NAMESPACE, token_key, value, Some(self.ttl))
                    .await;
            }
            Err(err) => {
                warn!(
                    event = "token_config_cache_encode_failed",
                    token_key = %token_key,
                    error = %err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::TokenLimits;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("ns", "k", json!(1), Some(Duration::from_secs(30)))
            .await;
        assert_eq!(cache.get("ns", "k").await, Some(json!(1)));
        assert_eq!(cache.get("other", "k").await, None);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get("ns", "k").await, None);
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_user_scoped_entries_are_evicted() {
        let cache = MemoryCache::new();
        let ttl = Some(Duration::from_secs(1800));
        for n in 0..1000 {
            cache
                .set(TOKEN_CONFIG_NAMESPACE, &format!("OpenRouter:u{n}"), json!(n), ttl)
                .await;
        }
        cache.set("ns", "pinned", json!("v"), None).await;
        assert_eq!(cache.entries.read().await.len(), 1001);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache
            .set(TOKEN_CONFIG_NAMESPACE, "OpenRouter:fresh", json!(0), ttl)
            .await;

        let entries = cache.entries.read().await;
        assert_eq!(entries.len(), 2);
        assert!(entries.contains_key(&("ns".to_string(), "pinned".to_string())));
    }

    #[tokio::test]
    async fn entries_without_ttl_persist_until_deleted() {
        let cache = MemoryCache::new();
        cache.set("ns", "k", json!("v"), None).await;
        cache.set("ns", "k", json!("w"), None).await;
        assert_eq!(cache.get("ns", "k").await, Some(json!("w")));
        cache.delete("ns", "k").await;
        assert_eq!(cache.get("ns", "k").await, None);
    }

    #[tokio::test]
    async fn token_store_round_trips_typed_configs() {
        let store = TokenConfigStore::new(Arc::new(MemoryCache::new()), Duration::from_secs(60));
        let mut config = EndpointTokenConfig::new();
        config.insert(
            "openrouter/auto".to_string(),
            TokenLimits {
                prompt: Some(10.0),
                completion: Some(30.0),
                context: Some(2_000_000),
            },
        );
        store.set("OpenRouter", &config).await;
        assert_eq!(store.get("OpenRouter").await, Some(config));
        assert_eq!(store.get("OpenRouter:u1").await, None);
    }
}
