//! Cache controller.
//!
//! Ties the fingerprint, the policy evaluator and the entry store together
//! around one call:
//!
//! ```text
//! START -> DISABLED -> INVOKE -> DONE
//! START -> EVALUATE -> LOAD -> DONE
//! START -> EVALUATE -> (MISS | EXPIRED | CORRUPTED) -> INVOKE -> MAYBE_SAVE -> DONE
//! ```
//!
//! Nothing is retried and the callable runs at most once per call.

mod disk_cache;
mod log;

pub use disk_cache::{delete_cache_file, CallableId, DiskCache, Memoized};
pub use log::{DecisionLog, LastSaved, LAST_SAVED_FILE_KEY, LAST_SAVED_KEY_KEY};
