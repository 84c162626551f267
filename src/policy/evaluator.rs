//! Pure cache decision function.

use std::time::Duration;

use super::tags::DecisionTag;
use super::CachePolicy;

/// What the controller should do for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Cache disabled: call, never read or write.
    Skip,
    /// Serve the stored entry.
    Load,
    /// Call and do not persist (no expiration configured).
    RecomputeNoSave,
    /// Call and persist the result.
    RecomputeAndSave,
}

impl CacheAction {
    pub fn invokes_callable(&self) -> bool {
        !matches!(self, CacheAction::Load)
    }

    pub fn saves(&self) -> bool {
        matches!(self, CacheAction::RecomputeAndSave)
    }
}

impl std::fmt::Display for CacheAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheAction::Skip => write!(f, "skip"),
            CacheAction::Load => write!(f, "load"),
            CacheAction::RecomputeNoSave => write!(f, "recompute_no_save"),
            CacheAction::RecomputeAndSave => write!(f, "recompute_and_save"),
        }
    }
}

/// State of the stored entry, as seen by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Missing,
    Corrupted,
    Present { age: Duration },
}

/// Snapshot of the five policy fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyFlags {
    pub enabled: bool,
    pub expiration: Option<Duration>,
    pub force: bool,
    pub ignore: bool,
}

impl PolicyFlags {
    pub fn from_policy<P: CachePolicy + ?Sized>(policy: &P) -> Self {
        Self {
            enabled: policy.cache_enabled(),
            expiration: policy.cache_expiration(),
            force: policy.force_cache_expiration(),
            ignore: policy.ignore_cache_expiration(),
        }
    }

    /// Whether a recomputed value gets written. Writes still happen under
    /// force, even without an expiration.
    pub fn persists(&self) -> bool {
        self.expiration.is_some() || self.force
    }
}

/// Result of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: CacheAction,
    pub tags: Vec<DecisionTag>,
}

/// Decides between skipping, loading and recomputing.
///
/// `probe` inspects the stored entry. It is only called when the flags allow
/// reading, so forced and uncacheable calls never touch the entry file.
///
/// Precedence: disabled, then force (wins over ignore for reads), then
/// ignore, then the TTL. Without a TTL nothing is read, ignore or not.
pub fn decide<F>(policy: &PolicyFlags, probe: F) -> Decision
where
    F: FnOnce() -> EntryState,
{
    let mut tags = Vec::new();

    if !policy.enabled {
        tags.push(DecisionTag::CacheDisabled);
        return Decision {
            action: CacheAction::Skip,
            tags,
        };
    }

    let mut read = false;
    if policy.ignore {
        if policy.force {
            tags.push(DecisionTag::ForceOverridesIgnore);
        } else {
            tags.push(DecisionTag::CacheExpirationIgnored);
            read = true;
        }
    }

    if policy.force {
        tags.push(DecisionTag::CacheExpirationForced);
        read = false;
    } else if let Some(ttl) = policy.expiration {
        tags.push(DecisionTag::CacheExpirationSet(ttl));
        read = true;
    } else {
        tags.push(DecisionTag::CacheExpirationNotSet);
        read = false;
    }

    let recompute = if policy.persists() {
        CacheAction::RecomputeAndSave
    } else {
        CacheAction::RecomputeNoSave
    };

    if read {
        match probe() {
            EntryState::Missing => tags.push(DecisionTag::CacheFileDoesNotExist),
            EntryState::Corrupted => {
                tags.push(DecisionTag::CacheFileExists);
                tags.push(DecisionTag::CacheFileCorrupted);
            }
            EntryState::Present { age } => {
                tags.push(DecisionTag::CacheFileExists);
                let fresh = policy.ignore || policy.expiration.is_some_and(|ttl| age < ttl);
                if fresh {
                    tags.push(DecisionTag::CacheLoaded);
                    return Decision {
                        action: CacheAction::Load,
                        tags,
                    };
                }
                tags.push(DecisionTag::CacheExpired(age));
            }
        }
    }

    Decision {
        action: recompute,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(enabled: bool, ttl: Option<u64>, force: bool, ignore: bool) -> PolicyFlags {
        PolicyFlags {
            enabled,
            expiration: ttl.map(Duration::from_secs),
            force,
            ignore,
        }
    }

    fn fresh() -> EntryState {
        EntryState::Present {
            age: Duration::from_secs(1),
        }
    }

    fn stale() -> EntryState {
        EntryState::Present {
            age: Duration::from_secs(120),
        }
    }

    fn never() -> EntryState {
        panic!("probe must not be called")
    }

    #[test]
    fn test_disabled_skips_without_probing() {
        let d = decide(&flags(false, Some(60), true, true), never);
        assert_eq!(d.action, CacheAction::Skip);
        assert_eq!(d.tags, vec![DecisionTag::CacheDisabled]);
    }

    #[test]
    fn test_fresh_entry_loads() {
        let d = decide(&flags(true, Some(60), false, false), fresh);
        assert_eq!(d.action, CacheAction::Load);
        assert_eq!(
            d.tags,
            vec![
                DecisionTag::CacheExpirationSet(Duration::from_secs(60)),
                DecisionTag::CacheFileExists,
                DecisionTag::CacheLoaded,
            ]
        );
    }

    #[test]
    fn test_stale_entry_recomputes_and_saves() {
        let d = decide(&flags(true, Some(60), false, false), stale);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
        assert_eq!(
            d.tags.last(),
            Some(&DecisionTag::CacheExpired(Duration::from_secs(120)))
        );
    }

    #[test]
    fn test_age_equal_to_ttl_is_expired() {
        let d = decide(&flags(true, Some(60), false, false), || EntryState::Present {
            age: Duration::from_secs(60),
        });
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
    }

    #[test]
    fn test_missing_entry_recomputes_and_saves() {
        let d = decide(&flags(true, Some(60), false, false), || EntryState::Missing);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
        assert!(d.tags.contains(&DecisionTag::CacheFileDoesNotExist));
    }

    #[test]
    fn test_corrupted_entry_recomputes_and_saves() {
        let d = decide(&flags(true, Some(60), false, false), || EntryState::Corrupted);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
        assert_eq!(
            &d.tags[1..],
            &[DecisionTag::CacheFileExists, DecisionTag::CacheFileCorrupted]
        );
    }

    #[test]
    fn test_force_never_reads_and_still_saves() {
        let d = decide(&flags(true, Some(60), true, false), never);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
        assert_eq!(d.tags, vec![DecisionTag::CacheExpirationForced]);

        // Force without a TTL still writes.
        let d = decide(&flags(true, None, true, false), never);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
    }

    #[test]
    fn test_force_wins_over_ignore() {
        let d = decide(&flags(true, Some(60), true, true), never);
        assert_eq!(d.action, CacheAction::RecomputeAndSave);
        assert_eq!(
            d.tags,
            vec![
                DecisionTag::ForceOverridesIgnore,
                DecisionTag::CacheExpirationForced
            ]
        );
    }

    #[test]
    fn test_ignore_loads_stale_entry() {
        let d = decide(&flags(true, Some(60), false, true), stale);
        assert_eq!(d.action, CacheAction::Load);
        assert_eq!(d.tags[0], DecisionTag::CacheExpirationIgnored);
        assert_eq!(d.tags.last(), Some(&DecisionTag::CacheLoaded));
    }

    #[test]
    fn test_ignore_without_ttl_never_reads() {
        let d = decide(&flags(true, None, false, true), never);
        assert_eq!(d.action, CacheAction::RecomputeNoSave);
        assert_eq!(
            d.tags,
            vec![
                DecisionTag::CacheExpirationIgnored,
                DecisionTag::CacheExpirationNotSet
            ]
        );
    }

    #[test]
    fn test_no_ttl_is_uncacheable() {
        let d = decide(&flags(true, None, false, false), never);
        assert_eq!(d.action, CacheAction::RecomputeNoSave);
        assert_eq!(d.tags, vec![DecisionTag::CacheExpirationNotSet]);
    }

    #[test]
    fn test_action_helpers() {
        assert!(CacheAction::Skip.invokes_callable());
        assert!(!CacheAction::Load.invokes_callable());
        assert!(CacheAction::RecomputeAndSave.saves());
        assert!(!CacheAction::RecomputeNoSave.saves());
    }
}
