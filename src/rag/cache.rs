//! TTL response cache keyed by request fingerprint.
//!
//! The cache is best-effort: it never fails a request. Undecodable entries
//! are logged and treated as a miss, and store write problems are swallowed.
//! Stored entries are immutable; the orchestrator flips `cached` only on the
//! copy it returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::types::AnswerResponse;

/// 256-bit fingerprint of the cacheable request identity, hex-encoded.
///
/// `model` is the resolved model name (explicit override or configured
/// default), so an explicit request for the default model and an omitted
/// model share one entry.
pub fn fingerprint(user_id: &str, query: &str, k: usize, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}:{query}:{k}:{model}"));
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored bytes, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
}

/// In-process TTL store. Entries expire lazily on read; stale entries are
/// swept on write.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheSlot>>,
}

struct CacheSlot {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|slot| slot.expires_at > Instant::now())
            .map(|slot| slot.value.clone())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, slot| slot.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get(&self, key: &str) -> Option<AnswerResponse> {
        let bytes = self.store.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(response) => Some(response),
            Err(err) => {
                tracing::warn!(
                    "discarding undecodable cache entry {}: {}",
                    &key[..16.min(key.len())],
                    err
                );
                None
            }
        }
    }

    pub async fn put(&self, key: &str, response: &AnswerResponse) {
        match serde_json::to_vec(response) {
            Ok(bytes) => self.store.set(key, bytes, self.ttl).await,
            Err(err) => tracing::warn!("failed to encode response for cache: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::CostUsd;
    use crate::rag::types::Citation;
    use uuid::Uuid;

    fn response() -> AnswerResponse {
        AnswerResponse {
            answer: "Offer, acceptance, and consideration.".to_string(),
            citations: vec![Citation {
                document_id: Uuid::parse_str("dddddddd-dddd-dddd-dddd-dddddddddddd")
                    .expect("uuid"),
                chunk_index: 0,
                snippet: "Contracts require offer, acceptance, and consideration.".to_string(),
                score: 0.97,
            }],
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            tokens_in: 50,
            tokens_out: 20,
            cost_usd: CostUsd::from_micros(123),
            latency_ms: 840,
            cached: false,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("user-1", "elements of a contract", 5, "gpt-4o-mini");
        let b = fingerprint("user-1", "elements of a contract", 5, "gpt-4o-mini");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_each_input() {
        let base = fingerprint("user-1", "query", 5, "gpt-4o-mini");
        assert_ne!(base, fingerprint("user-2", "query", 5, "gpt-4o-mini"));
        assert_ne!(base, fingerprint("user-1", "other", 5, "gpt-4o-mini"));
        assert_ne!(base, fingerprint("user-1", "query", 6, "gpt-4o-mini"));
        assert_ne!(base, fingerprint("user-1", "query", 5, "gpt-4o"));
    }

    #[tokio::test]
    async fn round_trip_preserves_cost_exactly() {
        let cache = ResponseCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(60));
        let original = response();

        cache.put("key", &original).await;
        let decoded = cache.get("key").await.expect("hit");

        assert_eq!(decoded, original);
        assert_eq!(decoded.cost_usd.to_string(), "0.000123");
    }

    #[tokio::test]
    async fn expired_entries_are_absent() {
        let cache = ResponseCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_millis(10));
        cache.put("key", &response()).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("key").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entries_read_as_miss() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set("key", b"not json".to_vec(), Duration::from_secs(60))
            .await;

        let cache = ResponseCache::new(store, Duration::from_secs(60));
        assert!(cache.get("key").await.is_none());
    }
}
