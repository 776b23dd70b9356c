use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use evorelay_common::{Error, Result};
use tokio::time::Instant;

use crate::kv::KvBackend;

/// Process-local backend with per-entry expiry, for tests and single-node runs.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
    closed: AtomicBool,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time-to-live for a key, if present.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Database("memory store is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    fn backend_id(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryBackend::new();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rewrite_refreshes_ttl() {
        let store = MemoryBackend::new();
        store.set_ex("k", "a", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set_ex("k", "b", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_access() {
        let store = MemoryBackend::new();
        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(store.get("k").await.is_err());
        assert!(store.set_ex("k", "v", Duration::from_secs(1)).await.is_err());
    }
}
