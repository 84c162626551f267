//! Error types for diskmemo.

use thiserror::Error;

/// Standard result type for diskmemo.
pub type CacheResult<T> = Result<T, CacheError>;

/// Possible errors in diskmemo.
///
/// Corrupted cache entries never show up here: they are reported as a
/// decision tag and recomputed.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The policy source lacks one of the five capability fields.
    #[error("{owner} does not have the attribute '{field}', required by the disk cache")]
    MissingPolicyField {
        /// Name of the object (or config table) that was inspected.
        owner: String,
        /// The missing field.
        field: &'static str,
    },

    /// The policy source is not a policy object at all.
    #[error("Invalid cache policy: {0}")]
    InvalidPolicy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Codec '{codec}' failed: {message}")]
    Codec { codec: String, message: String },

    #[cfg(feature = "cli")]
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("{0}")]
    Other(String),
}

impl CacheError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a codec error.
    pub fn codec<C: Into<String>, M: std::fmt::Display>(codec: C, message: M) -> Self {
        Self::Codec {
            codec: codec.into(),
            message: message.to_string(),
        }
    }

    /// Creates a missing-field error for the given owner.
    pub fn missing_field<S: Into<String>>(owner: S, field: &'static str) -> Self {
        Self::MissingPolicyField {
            owner: owner.into(),
            field,
        }
    }
}
