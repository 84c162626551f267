//! Serde-backed cache policy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CachePolicy;
use crate::{CacheError, CacheResult};

/// The five required policy fields, in declaration order.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "cache_enabled",
    "cache_dir",
    "cache_expiration",
    "force_cache_expiration",
    "ignore_cache_expiration",
];

/// Cache policy loaded from configuration.
///
/// In TOML, `cache_expiration` is a number of seconds or the string
/// `"none"`; `"none"` makes results uncacheable unless forced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub cache_enabled: bool,

    pub cache_dir: PathBuf,

    #[serde(with = "expiration_secs")]
    pub cache_expiration: Option<Duration>,

    pub force_cache_expiration: bool,

    pub ignore_cache_expiration: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_dir: default_cache_dir(),
            cache_expiration: Some(default_expiration()),
            force_cache_expiration: false,
            ignore_cache_expiration: false,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".diskmemo/cache")
}

fn default_expiration() -> Duration {
    Duration::from_secs(3600) // 1 hour
}

impl CacheSettings {
    /// Settings with a TTL, caching into `dir`.
    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: dir.into(),
            cache_expiration: Some(ttl),
            ..Self::default()
        }
    }

    /// Settings that cache into the per-user cache directory.
    pub fn user_default() -> Self {
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join("diskmemo"))
            .unwrap_or_else(default_cache_dir);
        Self {
            cache_dir,
            ..Self::default()
        }
    }

    /// Validates and parses a policy from a loosely typed value.
    ///
    /// `owner` names the value in error messages (e.g. `"[cache]"`).
    ///
    /// - not an object, or no `cache_enabled`: [`CacheError::InvalidPolicy`]
    /// - any other required field absent: [`CacheError::MissingPolicyField`]
    pub fn from_value(value: &Value, owner: &str) -> CacheResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            CacheError::InvalidPolicy(format!("{} is not a table -- is this a cache policy?", owner))
        })?;

        if !map.contains_key("cache_enabled") {
            return Err(CacheError::InvalidPolicy(format!(
                "cache_enabled is not in {} -- is this a cache policy?",
                owner
            )));
        }

        for field in REQUIRED_FIELDS {
            if !map.contains_key(field) {
                return Err(CacheError::missing_field(owner, field));
            }
        }

        serde_json::from_value(value.clone())
            .map_err(|e| CacheError::config(format!("{}: {}", owner, e)))
    }

    /// Parses a policy from a TOML table.
    pub fn from_toml(value: &toml::Value, owner: &str) -> CacheResult<Self> {
        Self::from_value(&serde_json::to_value(value)?, owner)
    }
}

impl CachePolicy for CacheSettings {
    fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_expiration(&self) -> Option<Duration> {
        self.cache_expiration
    }

    fn force_cache_expiration(&self) -> bool {
        self.force_cache_expiration
    }

    fn ignore_cache_expiration(&self) -> bool {
        self.ignore_cache_expiration
    }
}

/// `Option<Duration>` as float seconds, with `"none"` (or null) for `None`.
mod expiration_secs {
    use std::time::Duration;

    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ttl) => serializer.serialize_f64(ttl.as_secs_f64()),
            None => serializer.serialize_str("none"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        deserializer.deserialize_any(ExpirationVisitor)
    }

    struct ExpirationVisitor;

    impl<'de> Visitor<'de> for ExpirationVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a non-negative number of seconds or \"none\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|_| E::custom(format!("invalid cache_expiration {}", v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|_| E::custom(format!("invalid cache_expiration {}", v)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "none" | "" => Ok(None),
                other => Err(E::custom(format!("invalid cache_expiration '{}'", other))),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }
}
