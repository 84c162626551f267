//! Decision tags recorded in the decision log.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// One step of a cache decision.
///
/// Tags render as short snake_case strings (`cache_loaded`,
/// `cache_expired: 1.204s passed`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionTag {
    CacheDisabled,
    MethodCalled,
    /// Both override flags were set; force wins.
    ForceOverridesIgnore,
    CacheExpirationIgnored,
    CacheExpirationForced,
    CacheExpirationSet(Duration),
    CacheExpirationNotSet,
    CacheFileDoesNotExist,
    CacheFileExists,
    CacheFileCorrupted,
    /// The entry was older than the TTL; carries its age.
    CacheExpired(Duration),
    CacheLoaded,
    CacheSaved,
    CacheFileDeleted,
}

impl fmt::Display for DecisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionTag::CacheDisabled => write!(f, "cache_disabled"),
            DecisionTag::MethodCalled => write!(f, "method_called"),
            DecisionTag::ForceOverridesIgnore => write!(
                f,
                "ignore_cache_expiration and force_cache_expiration are both True - force_cache_expiration takes precedence"
            ),
            DecisionTag::CacheExpirationIgnored => write!(f, "cache_expiration_ignored"),
            DecisionTag::CacheExpirationForced => write!(f, "cache_expiration_forced"),
            DecisionTag::CacheExpirationSet(ttl) => {
                write!(f, "cache_expiration_set: {}s", ttl.as_secs_f64())
            }
            DecisionTag::CacheExpirationNotSet => write!(f, "cache_expiration_not_set"),
            DecisionTag::CacheFileDoesNotExist => write!(f, "cache_file_does_not_exist"),
            DecisionTag::CacheFileExists => write!(f, "cache_file_exists"),
            DecisionTag::CacheFileCorrupted => write!(f, "cache_file_corrupted"),
            DecisionTag::CacheExpired(age) => {
                write!(f, "cache_expired: {} passed", format_elapsed(*age))
            }
            DecisionTag::CacheLoaded => write!(f, "cache_loaded"),
            DecisionTag::CacheSaved => write!(f, "cache_saved"),
            DecisionTag::CacheFileDeleted => write!(f, "cache_file_deleted"),
        }
    }
}

impl Serialize for DecisionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Formats an elapsed time for the decision log.
///
/// - under 10s: milliseconds (`1.234s`)
/// - under a minute: tenths of a second (`42.5s`)
/// - under an hour: minutes (`12.5m`)
/// - otherwise: hours (`3.0h`)
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 10.0 {
        format!("{:.3}s", secs)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}
