//! Disk cache controller.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::log::{DecisionLog, LastSaved};
use crate::fingerprint::{CallArgs, Fingerprint};
use crate::policy::{
    decide, validate_policy, CacheAction, CachePolicy, DecisionTag, EntryState, PolicyFlags,
};
use crate::store::{age, now_epoch_secs, sanitize_key, Codec, EntryRead, EntryStore, JsonCodec};
use crate::{CacheError, CacheResult};

/// Identity of a memoized callable: the namespace it lives in plus its
/// qualified name.
///
/// Rust path separators (`::`) are rendered as `.` so decision keys read the
/// same whatever the namespace source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableId {
    namespace: String,
    name: String,
}

impl CallableId {
    pub fn new(namespace: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            namespace: namespace.as_ref().replace("::", "."),
            name: name.as_ref().replace("::", "."),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{namespace}.{name}.{fingerprint}`, stripped of characters that are
    /// invalid in file names.
    pub fn decision_key(&self, fingerprint: &Fingerprint) -> String {
        sanitize_key(&format!("{}.{}.{}", self.namespace, self.name, fingerprint))
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Builds a [`CallableId`] in the current module.
///
/// ```
/// use diskmemo::callable_id;
///
/// let id = callable_id!("Report::build");
/// assert_eq!(id.name(), "Report.build");
/// ```
#[macro_export]
macro_rules! callable_id {
    ($name:literal) => {
        $crate::controller::CallableId::new(module_path!(), $name)
    };
    ($name:path) => {
        $crate::controller::CallableId::new(module_path!(), stringify!($name))
    };
}

/// Value returned by a cached call, with the trace of how it was obtained.
#[derive(Debug, Clone)]
pub struct Memoized<T> {
    pub value: T,
    pub action: CacheAction,
    /// Decision log of this call only.
    pub log: DecisionLog,
}

impl<T> Memoized<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    /// Whether the value came from disk.
    pub fn from_cache(&self) -> bool {
        self.action == CacheAction::Load
    }
}

/// Memoizes calls to disk under a [`CachePolicy`].
///
/// The cache is the policy holder: it keeps the cumulative decision log and
/// the pointer to the last written entry across calls.
pub struct DiskCache<P> {
    policy: P,
    log: DecisionLog,
}

impl<P: CachePolicy> DiskCache<P> {
    /// Creates a cache. The policy is validated here, once.
    pub fn new(policy: P) -> CacheResult<Self> {
        validate_policy(&policy)?;
        Ok(Self {
            policy,
            log: DecisionLog::new(),
        })
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Changes the policy and validates the result.
    ///
    /// The change is applied to a copy and only installed if it validates,
    /// so on error the previous policy stays in place.
    pub fn update_policy<F>(&mut self, update: F) -> CacheResult<()>
    where
        P: Clone,
        F: FnOnce(&mut P),
    {
        let mut next = self.policy.clone();
        update(&mut next);
        validate_policy(&next)?;
        self.policy = next;
        Ok(())
    }

    pub fn store(&self) -> EntryStore {
        EntryStore::new(self.policy.cache_dir())
    }

    /// Cumulative decision log of every call made through this cache.
    pub fn status(&self) -> &DecisionLog {
        &self.log
    }

    /// Handle to the most recently written entry, if the last call wrote one.
    pub fn last_saved(&self) -> Option<&LastSaved> {
        self.log.last_saved()
    }

    /// Path of the entry file a call would use.
    pub fn entry_path(&self, callable: &CallableId, args: &CallArgs) -> PathBuf {
        self.store()
            .path_for(&callable.decision_key(&args.fingerprint()))
    }

    /// Runs `f` through the cache, storing results as JSON.
    ///
    /// `args` must describe the inputs `f` depends on; they are the only
    /// thing the fingerprint sees.
    pub fn run<T, E, F>(&mut self, callable: &CallableId, args: &CallArgs, f: F) -> Result<Memoized<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.run_with_codec(callable, args, &JsonCodec, f)
    }

    /// Runs a method-style callable: `f` receives the receiver. The receiver
    /// is not part of the fingerprint.
    pub fn run_method<R, T, E, F>(
        &mut self,
        receiver: &mut R,
        callable: &CallableId,
        args: &CallArgs,
        f: F,
    ) -> Result<Memoized<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce(&mut R) -> Result<T, E>,
    {
        self.run_with_codec(callable, args, &JsonCodec, || f(receiver))
    }

    /// Runs `f` through the cache with an explicit codec.
    ///
    /// Errors from `f` are returned unchanged and nothing is written for a
    /// failed call. `f` is invoked at most once.
    pub fn run_with_codec<T, C, E, F>(
        &mut self,
        callable: &CallableId,
        args: &CallArgs,
        codec: &C,
        f: F,
    ) -> Result<Memoized<T>, E>
    where
        C: Codec<T>,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let key = callable.decision_key(&args.fingerprint());
        let store = self.store();
        let path = store.path_for(&key);
        let flags = PolicyFlags::from_policy(&self.policy);

        let mut log = DecisionLog::for_call(&key);
        let mut loaded: Option<T> = None;

        let decision = decide(&flags, || probe_entry(&store, &path, codec, &mut loaded));
        log.extend(&key, decision.tags);

        match (decision.action, loaded) {
            (CacheAction::Load, Some(value)) => {
                tracing::debug!(key = %key, "cache entry loaded");
                self.log.merge(log.clone());
                return Ok(Memoized {
                    value,
                    action: CacheAction::Load,
                    log,
                });
            }
            (CacheAction::Load, None) => {
                return Err(CacheError::other(format!("no value decoded for {}", key)).into());
            }
            _ => {}
        }

        let value = f()?;
        log.push(&key, DecisionTag::MethodCalled);

        if decision.action.saves() {
            let payload = codec.encode(&value)?;
            store.write(&path, now_epoch_secs(), codec.id(), &payload)?;
            log.push(&key, DecisionTag::CacheSaved);
            tracing::info!(path = %path.display(), bytes = payload.len(), "cache entry saved");
            log.set_last_saved(LastSaved {
                path,
                key: key.clone(),
            });
        }

        tracing::debug!(
            key = %key,
            action = %decision.action,
            tags = ?log.tag_strings(&key),
            "cache decision"
        );

        self.log.merge(log.clone());
        Ok(Memoized {
            value,
            action: decision.action,
            log,
        })
    }

    /// Deletes the most recently written entry.
    ///
    /// Returns the deleted path, or `None` when nothing is recorded or the
    /// file is already gone. The pointer is cleared either way, so a second
    /// call returns `None`.
    pub fn invalidate_last_saved(&mut self) -> CacheResult<Option<PathBuf>> {
        let Some(last) = self.log.clear_last_saved() else {
            return Ok(None);
        };

        match delete_cache_file(Some(&last.path))? {
            Some(path) => {
                self.log.push(&last.key, DecisionTag::CacheFileDeleted);
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }
}

/// Reads and decodes the entry at `path` for the evaluator.
fn probe_entry<T, C: Codec<T>>(
    store: &EntryStore,
    path: &Path,
    codec: &C,
    loaded: &mut Option<T>,
) -> EntryState {
    match store.read(path) {
        EntryRead::Missing => EntryState::Missing,
        EntryRead::Corrupted(reason) => {
            tracing::warn!(path = %path.display(), reason = %reason, "corrupted cache entry");
            EntryState::Corrupted
        }
        EntryRead::Found(entry) => {
            if entry.codec != codec.id() {
                tracing::warn!(
                    path = %path.display(),
                    found = %entry.codec,
                    expected = %codec.id(),
                    "cache entry written by another codec"
                );
                return EntryState::Corrupted;
            }
            match codec.decode(&entry.payload) {
                Ok(value) => {
                    *loaded = Some(value);
                    EntryState::Present {
                        age: age(entry.created_at),
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cache entry does not decode");
                    EntryState::Corrupted
                }
            }
        }
    }
}

/// Deletes a cache file if a path is given and the file exists.
///
/// Returns the deleted path, or `None` if there was nothing to delete.
pub fn delete_cache_file(path: Option<&Path>) -> CacheResult<Option<PathBuf>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }

    std::fs::remove_file(path)?;
    tracing::info!(path = %path.display(), "cache file deleted");
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CacheSettings;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> CacheSettings {
        CacheSettings::with_ttl(dir, Duration::from_secs(60))
    }

    #[test]
    fn test_callable_id_renders_rust_paths_with_dots() {
        let id = CallableId::new("my_crate::reports", "Report::build");
        assert_eq!(id.to_string(), "my_crate.reports.Report.build");
    }

    #[test]
    fn test_callable_id_macro_uses_module_path() {
        let id = callable_id!("lookup");
        assert!(id.namespace().ends_with("controller.disk_cache.tests"));
        assert_eq!(id.name(), "lookup");

        let id = callable_id!(probe_entry);
        assert_eq!(id.name(), "probe_entry");
    }

    #[test]
    fn test_decision_key_is_sanitized() {
        let id = CallableId::new("ns", "outer.<locals>.f");
        let key = id.decision_key(&CallArgs::new().fingerprint());
        assert!(key.starts_with("ns.outer.locals.f."));
        assert!(!key.contains('<'));
    }

    #[test]
    fn test_run_saves_then_loads() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "double");
        let args = CallArgs::new().with_arg(21i64);
        let calls = Cell::new(0);

        let compute = || -> CacheResult<i64> {
            calls.set(calls.get() + 1);
            Ok(42)
        };

        let first = cache.run(&id, &args, compute).unwrap();
        assert_eq!(first.value, 42);
        assert_eq!(first.action, CacheAction::RecomputeAndSave);

        let second = cache.run(&id, &args, compute).unwrap();
        assert_eq!(second.value, 42);
        assert!(second.from_cache());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_last_saved_pointer_follows_calls() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "f");
        let args = CallArgs::new().with_arg("a");

        cache.run(&id, &args, || CacheResult::Ok("v".to_string())).unwrap();
        let last = cache.last_saved().cloned().unwrap();
        assert_eq!(last.path, cache.entry_path(&id, &args));
        assert_eq!(last.key, id.decision_key(&args.fingerprint()));

        // A load does not write, so the pointer is cleared.
        cache.run(&id, &args, || CacheResult::Ok("v".to_string())).unwrap();
        assert!(cache.last_saved().is_none());
    }

    #[test]
    fn test_invalidate_last_saved_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "f");
        let args = CallArgs::new();

        cache.run(&id, &args, || CacheResult::Ok(1u8)).unwrap();
        let path = cache.entry_path(&id, &args);
        assert!(path.exists());

        assert_eq!(cache.invalidate_last_saved().unwrap(), Some(path.clone()));
        assert!(!path.exists());
        let key = id.decision_key(&args.fingerprint());
        assert_eq!(
            cache.status().tags(&key).unwrap().last(),
            Some(&DecisionTag::CacheFileDeleted)
        );

        assert_eq!(cache.invalidate_last_saved().unwrap(), None);
    }

    #[test]
    fn test_invalidate_when_file_already_gone() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "f");
        let args = CallArgs::new();

        cache.run(&id, &args, || CacheResult::Ok(1u8)).unwrap();
        std::fs::remove_file(cache.entry_path(&id, &args)).unwrap();

        assert_eq!(cache.invalidate_last_saved().unwrap(), None);
        assert!(cache.last_saved().is_none());
    }

    #[test]
    fn test_codec_mismatch_reads_as_corrupted() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "bytes");
        let args = CallArgs::new();

        cache
            .run_with_codec(&id, &args, &crate::store::BytesCodec, || {
                CacheResult::Ok(b"raw".to_vec())
            })
            .unwrap();

        let result = cache
            .run(&id, &args, || CacheResult::Ok(vec![1u8, 2, 3]))
            .unwrap();
        assert_eq!(result.value, vec![1, 2, 3]);
        assert!(result
            .log
            .tags(&id.decision_key(&args.fingerprint()))
            .unwrap()
            .contains(&DecisionTag::CacheFileCorrupted));
    }

    #[test]
    fn test_run_method_passes_receiver() {
        struct Counter {
            calls: u32,
        }

        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();
        let id = CallableId::new("tests", "Counter::next");
        let args = CallArgs::new().with_kwarg("step", 1i64);
        let mut counter = Counter { calls: 0 };

        for _ in 0..3 {
            let result = cache
                .run_method(&mut counter, &id, &args, |c| {
                    c.calls += 1;
                    CacheResult::Ok(c.calls)
                })
                .unwrap();
            assert_eq!(result.value, 1);
        }
        assert_eq!(counter.calls, 1);
    }

    #[test]
    fn test_new_rejects_invalid_policy() {
        let policy = CacheSettings {
            cache_dir: PathBuf::new(),
            ..CacheSettings::default()
        };
        assert!(matches!(
            DiskCache::new(policy),
            Err(CacheError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_rejected_update_keeps_previous_policy() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(settings(tmp.path())).unwrap();

        let result = cache.update_policy(|p| p.cache_dir = PathBuf::new());
        assert!(matches!(result, Err(CacheError::InvalidPolicy(_))));
        assert_eq!(cache.policy().cache_dir, tmp.path());

        cache
            .update_policy(|p| p.force_cache_expiration = true)
            .unwrap();
        assert!(cache.policy().force_cache_expiration);
    }

    #[test]
    fn test_delete_cache_file_without_path() {
        assert_eq!(delete_cache_file(None).unwrap(), None);
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            delete_cache_file(Some(&tmp.path().join("absent.cache"))).unwrap(),
            None
        );
    }
}
