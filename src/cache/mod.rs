//! Page caching for data persistence and offline support.
//!
//! This module provides:
//! - A `KeyValueStore` port over opaque string keys and byte values
//! - SQLite, in-memory and no-op store backends
//! - `PageCache`, which stores one timestamped entry per page offset and
//!   lazily purges entries older than the TTL

mod layer;
mod storage;
mod traits;

pub use layer::PageCache;
pub use storage::{MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::KeyValueStore;
