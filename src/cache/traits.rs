//! Core traits and types for the caching system.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a key-value store backend.
///
/// These never escape [`super::PageCache`]; they are logged and degrade to a miss.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage I/O error: {0}")]
  Io(String),

  #[error("storage backend error: {0}")]
  Backend(#[from] rusqlite::Error),

  #[error("corrupt cache payload: {0}")]
  Corrupt(String),
}

/// Async get/set/delete over opaque string keys.
///
/// Values are opaque byte strings; callers own serialization.
/// Implementations must be thread-safe and may fail transiently.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Fetch the value stored under `key`, if any.
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

  /// Store `value` under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

  /// Remove `key`. Removing a missing key is not an error.
  async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
