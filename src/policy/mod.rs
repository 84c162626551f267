//! Cache policy: the capability interface and the decision function.
//!
//! Any type exposing the five policy fields can drive a
//! [`DiskCache`](crate::controller::DiskCache):
//!
//! - `cache_enabled`: when false, always call and never touch the disk
//! - `cache_dir`: where entry files live
//! - `cache_expiration`: TTL; `None` makes results uncacheable unless forced
//! - `force_cache_expiration`: always recompute (and still write)
//! - `ignore_cache_expiration`: serve stored entries whatever their age

mod evaluator;
mod settings;
mod tags;

pub use evaluator::{decide, CacheAction, Decision, EntryState, PolicyFlags};
pub use settings::{CacheSettings, REQUIRED_FIELDS};
pub use tags::{format_elapsed, DecisionTag};

use std::path::Path;
use std::time::Duration;

use crate::{CacheError, CacheResult};

/// Capability interface required of a policy holder.
pub trait CachePolicy {
    fn cache_enabled(&self) -> bool;

    fn cache_dir(&self) -> &Path;

    fn cache_expiration(&self) -> Option<Duration>;

    fn force_cache_expiration(&self) -> bool;

    fn ignore_cache_expiration(&self) -> bool;
}

impl<P: CachePolicy + ?Sized> CachePolicy for &P {
    fn cache_enabled(&self) -> bool {
        (**self).cache_enabled()
    }

    fn cache_dir(&self) -> &Path {
        (**self).cache_dir()
    }

    fn cache_expiration(&self) -> Option<Duration> {
        (**self).cache_expiration()
    }

    fn force_cache_expiration(&self) -> bool {
        (**self).force_cache_expiration()
    }

    fn ignore_cache_expiration(&self) -> bool {
        (**self).ignore_cache_expiration()
    }
}

impl<P: CachePolicy + ?Sized> CachePolicy for Box<P> {
    fn cache_enabled(&self) -> bool {
        (**self).cache_enabled()
    }

    fn cache_dir(&self) -> &Path {
        (**self).cache_dir()
    }

    fn cache_expiration(&self) -> Option<Duration> {
        (**self).cache_expiration()
    }

    fn force_cache_expiration(&self) -> bool {
        (**self).force_cache_expiration()
    }

    fn ignore_cache_expiration(&self) -> bool {
        (**self).ignore_cache_expiration()
    }
}

/// Checks a policy once, before it is used for any call.
///
/// An enabled policy needs a cache directory.
pub fn validate_policy<P: CachePolicy + ?Sized>(policy: &P) -> CacheResult<()> {
    if policy.cache_enabled() && policy.cache_dir().as_os_str().is_empty() {
        return Err(CacheError::InvalidPolicy(
            "cache_dir is empty while the cache is enabled".to_string(),
        ));
    }
    Ok(())
}
