//! Versioned value codecs.
//!
//! A codec turns a result value into bytes and back. Its id is written into
//! every entry header, so an entry written by another codec (or another
//! version of the same codec) reads back as corrupted instead of being
//! decoded into the wrong type.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{CacheError, CacheResult};

/// Bytes-in/bytes-out codec for values of type `T`.
pub trait Codec<T> {
    /// Stable identifier, including a version suffix.
    fn id(&self) -> &str;

    /// Encodes a value.
    fn encode(&self, value: &T) -> CacheResult<Vec<u8>>;

    /// Decodes a value.
    fn decode(&self, bytes: &[u8]) -> CacheResult<T>;
}

/// JSON codec for any serde type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const ID: &'static str = "json/1";
}

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn id(&self) -> &str {
        Self::ID
    }

    fn encode(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::codec(Self::ID, e))
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::codec(Self::ID, e))
    }
}

/// Passthrough codec for raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl BytesCodec {
    pub const ID: &'static str = "bytes/1";
}

impl Codec<Vec<u8>> for BytesCodec {
    fn id(&self) -> &str {
        Self::ID
    }

    fn encode(&self, value: &Vec<u8>) -> CacheResult<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}
