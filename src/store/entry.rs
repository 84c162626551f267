//! On-disk cache entries.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::{CacheError, CacheResult};

const MAGIC: &[u8; 4] = b"DMEM";

/// Current frame layout version.
pub const FRAME_VERSION: u8 = 1;

/// File extension of entry files.
pub const ENTRY_EXTENSION: &str = "cache";

/// Characters that are not allowed in entry file names.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// One persisted result.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Creation time, epoch seconds.
    pub created_at: f64,
    /// Id of the codec that produced `payload`.
    pub codec: String,
    /// Encoded value.
    pub payload: Vec<u8>,
}

/// Outcome of reading an entry file.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryRead {
    Missing,
    /// The file exists but cannot be used; the string says why.
    Corrupted(String),
    Found(Entry),
}

/// Encodes an entry frame:
/// `MAGIC | version u8 | codec len u8 | codec | created_at f64 LE | payload len u64 LE | payload`.
pub fn encode_frame(created_at: f64, codec: &str, payload: &[u8]) -> CacheResult<Vec<u8>> {
    let codec_len = u8::try_from(codec.len())
        .map_err(|_| CacheError::codec(codec, "codec id longer than 255 bytes"))?;

    let mut out = Vec::with_capacity(4 + 1 + 1 + codec.len() + 8 + 8 + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(FRAME_VERSION);
    out.push(codec_len);
    out.extend_from_slice(codec.as_bytes());
    out.extend_from_slice(&created_at.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decodes an entry frame.
pub fn decode_frame(bytes: &[u8]) -> Result<Entry, String> {
    let mut cursor = FrameCursor { bytes, pos: 0 };

    if bytes.is_empty() {
        return Err("empty file".to_string());
    }
    if cursor.take(4)? != MAGIC {
        return Err("bad magic".to_string());
    }
    let version = cursor.take(1)?[0];
    if version != FRAME_VERSION {
        return Err(format!("unsupported frame version {}", version));
    }
    let codec_len = cursor.take(1)?[0] as usize;
    let codec = std::str::from_utf8(cursor.take(codec_len)?)
        .map_err(|_| "codec id is not utf-8".to_string())?
        .to_string();
    let created_at = f64::from_le_bytes(cursor.take_array()?);
    if !created_at.is_finite() {
        return Err("non-finite timestamp".to_string());
    }
    let payload_len = u64::from_le_bytes(cursor.take_array()?);
    let payload_len =
        usize::try_from(payload_len).map_err(|_| "payload length overflow".to_string())?;
    let payload = cursor.take(payload_len)?.to_vec();
    if cursor.pos != bytes.len() {
        return Err("trailing bytes".to_string());
    }

    Ok(Entry {
        created_at,
        codec,
        payload,
    })
}

struct FrameCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| "truncated".to_string())?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array(&mut self) -> Result<[u8; 8], String> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(out)
    }
}

/// Removes characters that are invalid in file names from a decision key.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c))
        .collect()
}

/// Current time as epoch seconds.
pub fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Age of an entry created at `created_at`, measured now.
pub fn age(created_at: f64) -> Duration {
    age_at(created_at, now_epoch_secs())
}

/// Age of an entry at a given instant.
///
/// Timestamps in the future count as zero; ages too large for a `Duration`
/// (or a NaN timestamp) saturate to `Duration::MAX`.
pub fn age_at(created_at: f64, now: f64) -> Duration {
    if now <= created_at {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(now - created_at).unwrap_or(Duration::MAX)
}

/// Directory of entry files.
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file for a decision key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), ENTRY_EXTENSION))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Reads an entry. Never fails: unreadable files are reported as corrupted.
    pub fn read(&self, path: &Path) -> EntryRead {
        match fs::read(path) {
            Ok(bytes) => match decode_frame(&bytes) {
                Ok(entry) => EntryRead::Found(entry),
                Err(reason) => EntryRead::Corrupted(reason),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => EntryRead::Missing,
            Err(e) => EntryRead::Corrupted(e.to_string()),
        }
    }

    /// Writes an entry, replacing any previous file at `path` as a whole.
    pub fn write(
        &self,
        path: &Path,
        created_at: f64,
        codec: &str,
        payload: &[u8],
    ) -> CacheResult<()> {
        let frame = encode_frame(created_at, codec, payload)?;

        let parent = path.parent().unwrap_or(self.dir.as_path());
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::debug!(dir = %parent.display(), "cache directory created");
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CacheError::other(format!("not a file path: {}", path.display())))?;
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        fs::write(&tmp, &frame)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    /// Removes an entry file. Returns `false` if it did not exist.
    pub fn remove(&self, path: &Path) -> CacheResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists entry files in the store directory, sorted by path.
    pub fn entries(&self) -> CacheResult<Vec<PathBuf>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_frame_decodes_what_it_encodes() {
        let frame = encode_frame(1_700_000_000.25, "json/1", b"\"hello\"").unwrap();
        let entry = decode_frame(&frame).unwrap();
        assert_eq!(entry.created_at, 1_700_000_000.25);
        assert_eq!(entry.codec, "json/1");
        assert_eq!(entry.payload, b"\"hello\"");
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = encode_frame(1.0, "json/1", b"payload").unwrap();
        for cut in [0, 3, 5, 10, frame.len() - 1] {
            assert!(decode_frame(&frame[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut frame = encode_frame(1.0, "json/1", b"x").unwrap();
        frame.push(0);
        assert_eq!(decode_frame(&frame).unwrap_err(), "trailing bytes");
    }

    #[test]
    fn test_bad_magic_and_version() {
        assert_eq!(decode_frame(b"NOPE").unwrap_err(), "bad magic");

        let mut frame = encode_frame(1.0, "json/1", b"x").unwrap();
        frame[4] = 99;
        assert!(decode_frame(&frame).unwrap_err().contains("version 99"));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(
            sanitize_key(r#"mod.outer.<locals>.f:"a/b\c|d?e*"#),
            "mod.outer.locals.fabcde"
        );
    }

    #[test]
    fn test_age_at_saturates() {
        assert_eq!(age_at(100.0, 90.0), Duration::ZERO);
        assert_eq!(age_at(100.0, 102.5), Duration::from_millis(2500));
    }

    #[test]
    fn test_age_at_absurd_timestamps_are_ancient() {
        let now = 1_700_000_000.0;
        assert_eq!(age_at(-1e30, now), Duration::MAX);
        assert_eq!(age_at(f64::NAN, now), Duration::MAX);
        assert_eq!(age_at(f64::INFINITY, now), Duration::ZERO);
    }

    #[test]
    fn test_write_creates_dir_and_reads_back() {
        let tmp = TempDir::new().unwrap();
        let store = EntryStore::new(tmp.path().join("nested").join("cache"));
        let path = store.path_for("ns.f.abc");

        assert_eq!(store.read(&path), EntryRead::Missing);
        assert!(!store.exists(&path));

        store.write(&path, 42.0, "bytes/1", b"data").unwrap();
        assert!(store.exists(&path));

        match store.read(&path) {
            EntryRead::Found(entry) => {
                assert_eq!(entry.created_at, 42.0);
                assert_eq!(entry.payload, b"data");
            }
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn test_write_overwrites_whole_file() {
        let tmp = TempDir::new().unwrap();
        let store = EntryStore::new(tmp.path());
        let path = store.path_for("k");

        store.write(&path, 1.0, "bytes/1", b"a much longer first payload").unwrap();
        store.write(&path, 2.0, "bytes/1", b"short").unwrap();

        match store.read(&path) {
            EntryRead::Found(entry) => assert_eq!(entry.payload, b"short"),
            other => panic!("expected entry, got {:?}", other),
        }
        // No temp files left behind.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_zero_byte_file_is_corrupted() {
        let tmp = TempDir::new().unwrap();
        let store = EntryStore::new(tmp.path());
        let path = store.path_for("k");
        fs::write(&path, b"").unwrap();

        assert!(matches!(store.read(&path), EntryRead::Corrupted(_)));
    }

    #[test]
    fn test_entries_and_remove() {
        let tmp = TempDir::new().unwrap();
        let store = EntryStore::new(tmp.path());
        assert!(store.entries().unwrap().is_empty());

        let a = store.path_for("a");
        let b = store.path_for("b");
        store.write(&a, 1.0, "bytes/1", b"1").unwrap();
        store.write(&b, 1.0, "bytes/1", b"2").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.entries().unwrap(), vec![a.clone(), b]);
        assert!(store.remove(&a).unwrap());
        assert!(!store.remove(&a).unwrap());
    }

    #[test]
    fn test_entries_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = EntryStore::new(tmp.path().join("absent"));
        assert!(store.entries().unwrap().is_empty());
    }
}
