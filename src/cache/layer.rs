//! Page cache: TTL-bounded pages on top of a key-value store.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::traits::{KeyValueStore, StoreError};
use crate::config::DEFAULT_KEY_PREFIX;
use crate::pokeapi::types::Page;

/// Persisted wrapper around a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
  /// Creation time, epoch milliseconds
  pub timestamp: i64,
  pub data: Page,
}

/// Best-effort page cache.
///
/// Store failures and corrupt payloads are logged and treated as a miss (for
/// reads) or a no-op (for writes); nothing here ever returns an error.
pub struct PageCache<S: KeyValueStore> {
  store: Arc<S>,
  /// Entries older than this are purged on read
  ttl: Duration,
  prefix: String,
}

impl<S: KeyValueStore> PageCache<S> {
  /// Create a page cache over the given store.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      ttl: Duration::hours(24),
      prefix: DEFAULT_KEY_PREFIX.to_string(),
    }
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = prefix.into();
    self
  }

  /// Storage key for a page offset.
  pub fn key(&self, offset: usize) -> String {
    format!("{}{}", self.prefix, offset)
  }

  /// An entry is valid while `now - timestamp <= ttl`. An age that does not
  /// fit in an i64 counts as expired.
  fn is_expired_at(&self, entry: &CacheEntry, now_ms: i64) -> bool {
    match now_ms.checked_sub(entry.timestamp) {
      Some(age) => age > self.ttl.num_milliseconds(),
      None => true,
    }
  }

  fn decode_entry(raw: &[u8]) -> Result<CacheEntry, StoreError> {
    serde_json::from_slice(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
  }

  /// Look up the page at `offset`, purging it if it has outlived the TTL.
  pub async fn read(&self, offset: usize) -> Option<Page> {
    let key = self.key(offset);

    let raw = match self.store.get(&key).await {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        trace!(%key, "Cache miss");
        return None;
      }
      Err(e) => {
        warn!(%key, error = %e, "Failed reading cache");
        return None;
      }
    };

    let entry = match Self::decode_entry(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(%key, error = %e, "Ignoring unreadable cache entry");
        return None;
      }
    };

    if self.is_expired_at(&entry, Utc::now().timestamp_millis()) {
      debug!(%key, "Cache entry expired");
      self.invalidate(offset).await;
      return None;
    }

    trace!(%key, items = entry.data.pokemons.len(), "Cache hit");
    Some(entry.data)
  }

  /// Overwrite the entry for `offset`, stamped with the current time.
  pub async fn write(&self, offset: usize, page: &Page) {
    let key = self.key(offset);
    let entry = CacheEntry {
      timestamp: Utc::now().timestamp_millis(),
      data: page.clone(),
    };

    let raw = match serde_json::to_vec(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(%key, error = %e, "Failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self.store.set(&key, &raw).await {
      warn!(%key, error = %e, "Failed writing cache");
    }
  }

  /// Delete the entry for `offset`.
  pub async fn invalidate(&self, offset: usize) {
    let key = self.key(offset);
    if let Err(e) = self.store.delete(&key).await {
      warn!(%key, error = %e, "Failed deleting cache entry");
    }
  }
}

impl<S: KeyValueStore> Clone for PageCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      ttl: self.ttl,
      prefix: self.prefix.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use crate::pokeapi::types::Pokemon;
  use async_trait::async_trait;

  fn page(ids: &[u32], count: usize) -> Page {
    Page {
      pokemons: ids
        .iter()
        .map(|&id| Pokemon {
          id,
          name: format!("mon{}", id),
          sprite: None,
          types: vec!["normal".to_string()],
        })
        .collect(),
      count,
    }
  }

  fn aged_entry(page: &Page, age: Duration) -> Vec<u8> {
    let entry = CacheEntry {
      timestamp: (Utc::now() - age).timestamp_millis(),
      data: page.clone(),
    };
    serde_json::to_vec(&entry).unwrap()
  }

  /// Store whose every operation fails.
  struct BrokenStorage;

  #[async_trait]
  impl KeyValueStore for BrokenStorage {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
      Err(StoreError::Io("disk unplugged".into()))
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
      Err(StoreError::Io("quota exceeded".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
      Err(StoreError::Io("disk unplugged".into()))
    }
  }

  #[test]
  fn test_key_format() {
    let cache = PageCache::new(Arc::new(MemoryStorage::new()));
    assert_eq!(cache.key(0), "poke_cache_v1_0");
    assert_eq!(cache.key(40), "poke_cache_v1_40");
    assert_eq!(cache.with_prefix("p_").key(20), "p_20");
  }

  #[tokio::test]
  async fn test_round_trip() {
    let cache = PageCache::new(Arc::new(MemoryStorage::new()));
    let p = page(&[1, 2, 3], 9);

    assert_eq!(cache.read(0).await, None);
    cache.write(0, &p).await;
    assert_eq!(cache.read(0).await, Some(p.clone()));
    // Reading does not consume the entry
    assert_eq!(cache.read(0).await, Some(p));
  }

  #[tokio::test]
  async fn test_stored_format() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store));
    cache.write(20, &page(&[21], 151)).await;

    let raw = store.get("poke_cache_v1_20").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert!(json["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(json["data"]["count"], 151);
    assert_eq!(json["data"]["pokemons"][0]["id"], 21);
  }

  #[tokio::test]
  async fn test_entry_within_ttl_is_served() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store));
    let p = page(&[1], 1);
    store
      .set(&cache.key(0), &aged_entry(&p, Duration::hours(23)))
      .await
      .unwrap();

    assert_eq!(cache.read(0).await, Some(p));
  }

  #[tokio::test]
  async fn test_expired_entry_is_purged() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store));
    store
      .set(&cache.key(0), &aged_entry(&page(&[1], 1), Duration::hours(25)))
      .await
      .unwrap();

    assert_eq!(cache.read(0).await, None);
    assert_eq!(store.get("poke_cache_v1_0").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_custom_ttl() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store)).with_ttl(Duration::minutes(5));
    store
      .set(&cache.key(0), &aged_entry(&page(&[1], 1), Duration::minutes(6)))
      .await
      .unwrap();

    assert_eq!(cache.read(0).await, None);
  }

  #[tokio::test]
  async fn test_corrupt_payload_is_a_miss() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store));
    store.set("poke_cache_v1_0", b"{not json").await.unwrap();
    store
      .set("poke_cache_v1_20", br#"{"timestamp": 1}"#)
      .await
      .unwrap();

    assert_eq!(cache.read(0).await, None);
    assert_eq!(cache.read(20).await, None);
  }

  #[tokio::test]
  async fn test_out_of_range_timestamp_is_a_miss() {
    let store = Arc::new(MemoryStorage::new());
    let cache = PageCache::new(Arc::clone(&store));
    store
      .set(
        "poke_cache_v1_0",
        br#"{"timestamp": -9223372036854775808, "data": {"pokemons": [], "count": 0}}"#,
      )
      .await
      .unwrap();

    assert_eq!(cache.read(0).await, None);
    assert_eq!(store.get("poke_cache_v1_0").await.unwrap(), None);
  }

  #[test]
  fn test_ttl_boundary_is_inclusive() {
    let cache = PageCache::new(Arc::new(MemoryStorage::new())).with_ttl(Duration::hours(24));
    let entry = CacheEntry {
      timestamp: 1_700_000_000_000,
      data: page(&[1], 1),
    };
    let ttl_ms = Duration::hours(24).num_milliseconds();

    assert!(!cache.is_expired_at(&entry, entry.timestamp));
    assert!(!cache.is_expired_at(&entry, entry.timestamp + ttl_ms));
    assert!(cache.is_expired_at(&entry, entry.timestamp + ttl_ms + 1));
    assert!(cache.is_expired_at(&entry, i64::MIN));
  }

  #[test]
  fn test_decode_entry_reports_corruption() {
    let err = PageCache::<MemoryStorage>::decode_entry(b"{not json").unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
  }

  #[tokio::test]
  async fn test_write_overwrites() {
    let cache = PageCache::new(Arc::new(MemoryStorage::new()));
    cache.write(0, &page(&[1, 2], 2)).await;
    cache.write(0, &page(&[3], 1)).await;
    assert_eq!(cache.read(0).await, Some(page(&[3], 1)));
  }

  #[tokio::test]
  async fn test_invalidate() {
    let cache = PageCache::new(Arc::new(MemoryStorage::new()));
    cache.write(0, &page(&[1], 1)).await;
    cache.write(20, &page(&[21], 1)).await;

    cache.invalidate(0).await;
    assert_eq!(cache.read(0).await, None);
    assert!(cache.read(20).await.is_some());
  }

  #[tokio::test]
  async fn test_store_failures_are_swallowed() {
    let cache = PageCache::new(Arc::new(BrokenStorage));
    cache.write(0, &page(&[1], 1)).await;
    cache.invalidate(0).await;
    assert_eq!(cache.read(0).await, None);
  }
}
