//! Durable storage for cache entries.
//!
//! One file per decision key. Files are written whole (temp file + rename)
//! and anything that fails to decode is reported as corrupted rather than
//! as an error, so a damaged file only ever costs a recomputation.

mod codec;
mod entry;

pub use codec::{BytesCodec, Codec, JsonCodec};
pub use entry::{
    age, age_at, decode_frame, encode_frame, now_epoch_secs, sanitize_key, Entry, EntryRead,
    EntryStore, ENTRY_EXTENSION, FRAME_VERSION,
};
