use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// The single key the environment context is stored under
pub const CONTEXT_CACHE_KEY: &str = "splunk_context";

pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(300);

/// Fields that exist in most deployments, offered to the completion prompt
pub const COMMON_FIELDS: &[&str] = &[
    "host", "source", "sourcetype", "_time", "index", "user", "action", "status", "method",
    "uri_path", "src_ip", "dest_ip", "bytes", "duration",
];

/// Environment facts used to steer SPL generation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    /// Sorted, de-duplicated index names
    pub indexes: Vec<String>,
    pub common_fields: Vec<String>,
}

impl EnvironmentContext {
    pub fn new(mut indexes: Vec<String>, common_fields: Vec<String>) -> Self {
        indexes.sort();
        indexes.dedup();
        Self { indexes, common_fields }
    }

    /// Context built from live indexes and the standard field list
    pub fn with_indexes(indexes: Vec<String>) -> Self {
        Self::new(indexes, COMMON_FIELDS.iter().map(|f| f.to_string()).collect())
    }

    /// Served when the backend cannot be asked
    pub fn minimal() -> Self {
        Self::new(
            vec!["main".to_string(), "_internal".to_string()],
            ["host", "source", "sourcetype", "_time"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        )
    }
}

/// Time-limited cache for the environment context
pub struct ContextCache {
    /// Map from cache key to cached context
    cache: RwLock<HashMap<String, CachedContext>>,

    ttl: Duration,
}

#[derive(Clone)]
struct CachedContext {
    context: EnvironmentContext,
    stored_at: Instant,
}

impl ContextCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached context
    /// Removes the entry when it has outlived the TTL
    pub async fn get(&self) -> Option<EnvironmentContext> {
        {
            let cache = self.cache.read().await;
            let entry = cache.get(CONTEXT_CACHE_KEY)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.context.clone());
            }
        }

        self.cache.write().await.remove(CONTEXT_CACHE_KEY);
        None
    }

    pub async fn insert(&self, context: EnvironmentContext) {
        self.cache.write().await.insert(
            CONTEXT_CACHE_KEY.to_string(),
            CachedContext {
                context,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_sorts_indexes() {
        let ctx = EnvironmentContext::with_indexes(vec!["web".into(), "main".into(), "web".into()]);
        assert_eq!(ctx.indexes, vec!["main", "web"]);
        assert!(ctx.common_fields.contains(&"src_ip".to_string()));
        assert_eq!(EnvironmentContext::minimal().indexes, vec!["_internal", "main"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ContextCache::new(Duration::from_secs(300));
        assert!(cache.get().await.is_none());

        cache.insert(EnvironmentContext::minimal()).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get().await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ContextCache::default();
        cache.insert(EnvironmentContext::minimal()).await;
        cache.clear().await;
        assert!(cache.get().await.is_none());
    }
}
