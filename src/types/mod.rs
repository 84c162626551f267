//! Shared types.

pub mod config;
pub mod errors;

pub use config::{Config, GeneralConfig, MemoryConfig, CONFIG_FILE_NAME};
pub use errors::{CacheError, CacheResult};
