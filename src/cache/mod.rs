//! 缓存模块：请求级去重缓存（绝对 TTL + 并发合并）与通用 LRU 缓存。
//!
//! # Caching Module
//!
//! Two distinct eviction strategies live here and are kept separate on purpose:
//! request caching wants time-bounded freshness, provider-response memoization
//! wants bounded memory.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestCache`] | Absolute-TTL memoization with in-flight coalescing |
//! | [`BoundedCache`] | Fixed-capacity LRU store |
//! | [`CacheKey`] | Normalized, hashed request identity |
//!
//! ## Example
//!
//! ```rust
//! use ai_gen_pipeline::cache::BoundedCache;
//!
//! let cache = BoundedCache::new(2);
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.get(&"a");
//! assert_eq!(cache.set("c", 3), Some(("b", 2)));
//! ```

mod key;
mod bounded;
mod request;

pub use key::{canonical_form, normalize_topic, CacheKey, RequestKind};
pub use bounded::BoundedCache;
pub use request::{CacheEntry, RequestCache, RequestCacheStats, DEFAULT_REQUEST_TTL};
