//! # diskmemo
//!
//! Disk-backed memoization with TTL policies and decision logs.
//!
//! Given a callable, its arguments and a [`CachePolicy`], a [`DiskCache`]
//! decides whether to serve a stored result or recompute and persist a new
//! one, and records why in a [`DecisionLog`].
//!
//! ```no_run
//! use std::time::Duration;
//! use diskmemo::{callable_id, CacheResult, CacheSettings, CallArgs, DiskCache};
//!
//! # fn main() -> CacheResult<()> {
//! let mut cache = DiskCache::new(CacheSettings::with_ttl("/tmp/c", Duration::from_secs(2)))?;
//! let args = CallArgs::new().with_arg("a");
//!
//! let first = cache.run(&callable_id!("lookup"), &args, || CacheResult::Ok("slow".to_string()))?;
//! let second = cache.run(&callable_id!("lookup"), &args, || CacheResult::Ok("slow".to_string()))?;
//! assert!(second.from_cache());
//! println!("{}", cache.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`fingerprint`] - Canonical argument shapes and SHA-256 fingerprints
//! - [`store`] - Entry files and value codecs
//! - [`policy`] - Capability interface and decision function
//! - [`controller`] - Disk cache controller and decision log
//! - [`memory`] - In-process LRU memoizer
//! - [`cli`] - Command line interface
//! - [`types`] - Configuration and errors

#[cfg(feature = "cli")]
pub mod cli;
pub mod controller;
pub mod fingerprint;
pub mod memory;
pub mod policy;
pub mod store;
pub mod types;

pub use controller::{delete_cache_file, CallableId, DecisionLog, DiskCache, LastSaved, Memoized};
pub use fingerprint::{fingerprint, ArgValue, CallArgs, Fingerprint};
pub use memory::MemoryCache;
pub use policy::{CacheAction, CachePolicy, CacheSettings, DecisionTag};
pub use store::{BytesCodec, Codec, JsonCodec};
pub use types::config::Config;
pub use types::errors::{CacheError, CacheResult};
