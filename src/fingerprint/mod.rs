//! Deterministic fingerprints of call arguments.
//!
//! The fingerprint is a SHA-256 hex digest over the canonical rendering of
//! the positional arguments (order significant) and the keyword arguments
//! (order insignificant).

mod args;

pub use args::{ArgValue, CallArgs, Scalar};

use std::fmt;

use sha2::{Digest, Sha256};

/// Fixed-length hex digest identifying one set of call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a call.
pub fn fingerprint(args: &CallArgs) -> Fingerprint {
    let encoded = format!("{}_{}", args.render_positional(), args.render_keyword());

    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());

    Fingerprint(hex::encode(hasher.finalize()))
}

impl CallArgs {
    /// Shorthand for [`fingerprint`].
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}
