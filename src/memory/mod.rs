//! In-memory memoization.
//!
//! A bounded LRU keyed by callable and argument fingerprint, for results
//! that only need to live as long as the process.

mod lru;

pub use lru::{CachedValue, MemoryCache, MemoryStats};
