use crate::errors::BackendError;
use crate::store::KvBackend;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// In-process key-value backend on top of a moka cache.
///
/// Each entry remembers the TTL it was written with and moka drops it once
/// that TTL has elapsed, so reads after expiry see the key as absent. Used
/// for local runs without Redis and for tests.
#[derive(Clone)]
pub struct MemoryBackend {
    cache: Cache<String, TtlEntry>,
}

#[derive(Debug, Clone)]
struct TtlEntry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, TtlEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &TtlEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &TtlEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

impl MemoryBackend {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        self.cache
            .insert(
                key.to_string(),
                TtlEntry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let backend = MemoryBackend::default();
        backend
            .set_with_ttl("key", "42", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(backend.get("key").await, Ok(Some("42".to_string())));
        assert_eq!(backend.get("other").await, Ok(None));
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let backend = MemoryBackend::default();
        backend
            .set_with_ttl("short", "1", Duration::from_millis(50))
            .await
            .unwrap();
        backend
            .set_with_ttl("long", "2", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(backend.get("short").await, Ok(None));
        assert_eq!(backend.get("long").await, Ok(Some("2".to_string())));
    }
}
