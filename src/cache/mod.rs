//! Local object cache
//!
//! One file per (bucket, key) under a single cache root, with an ETag sidecar
//! and a lock file alongside each object.

pub mod eviction;
pub mod lock;
pub mod object_cache;

pub use eviction::{CachedObject, EvictionPolicy, KeepAll, LruBySize};
pub use lock::KeyLock;
pub use object_cache::{object_file_name, CacheEntry, ObjectCache};
