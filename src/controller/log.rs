//! Decision log and last-saved bookkeeping.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::policy::DecisionTag;

/// Reserved key for the path of the last written entry.
pub const LAST_SAVED_FILE_KEY: &str = "last_saved_cache_file";

/// Reserved key for the decision key of the last written entry.
pub const LAST_SAVED_KEY_KEY: &str = "last_saved_cache_file_key";

/// Handle to the most recently written entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSaved {
    pub path: PathBuf,
    pub key: String,
}

/// Trace of cache decisions, keyed by decision key.
///
/// Keys keep their first-seen order. A fresh log is built for every call and
/// then merged into the cache's cumulative log: merging replaces a key's tags
/// and overwrites the last-saved pointer (clearing it when the merged call
/// did not write).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionLog {
    entries: Vec<(String, Vec<DecisionTag>)>,
    last_saved: Option<LastSaved>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the log of a single call.
    pub fn for_call(key: &str) -> Self {
        Self {
            entries: vec![(key.to_string(), Vec::new())],
            last_saved: None,
        }
    }

    pub fn push(&mut self, key: &str, tag: DecisionTag) {
        self.tags_mut(key).push(tag);
    }

    pub fn extend<I: IntoIterator<Item = DecisionTag>>(&mut self, key: &str, tags: I) {
        self.tags_mut(key).extend(tags);
    }

    fn tags_mut(&mut self, key: &str) -> &mut Vec<DecisionTag> {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn tags(&self, key: &str) -> Option<&[DecisionTag]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, tags)| tags.as_slice())
    }

    /// Tags of a key rendered as strings.
    pub fn tag_strings(&self, key: &str) -> Vec<String> {
        self.tags(key)
            .map(|tags| tags.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_saved(&self) -> Option<&LastSaved> {
        self.last_saved.as_ref()
    }

    pub fn last_saved_cache_file(&self) -> Option<&Path> {
        self.last_saved.as_ref().map(|l| l.path.as_path())
    }

    pub fn last_saved_cache_file_key(&self) -> Option<&str> {
        self.last_saved.as_ref().map(|l| l.key.as_str())
    }

    pub(crate) fn set_last_saved(&mut self, last: LastSaved) {
        self.last_saved = Some(last);
    }

    pub(crate) fn clear_last_saved(&mut self) -> Option<LastSaved> {
        self.last_saved.take()
    }

    /// Merges a per-call log into this one.
    pub fn merge(&mut self, other: DecisionLog) {
        for (key, tags) in other.entries {
            *self.tags_mut(&key) = tags;
        }
        self.last_saved = other.last_saved;
    }

    /// JSON object of key → tag strings, plus the two reserved keys.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, tags) in &self.entries {
            map.insert(
                key.clone(),
                Value::Array(tags.iter().map(|t| Value::String(t.to_string())).collect()),
            );
        }
        map.insert(
            LAST_SAVED_FILE_KEY.to_string(),
            self.last_saved_cache_file()
                .map(|p| Value::String(p.display().to_string()))
                .unwrap_or(Value::Null),
        );
        map.insert(
            LAST_SAVED_KEY_KEY.to_string(),
            self.last_saved_cache_file_key()
                .map(|k| Value::String(k.to_string()))
                .unwrap_or(Value::Null),
        );
        Value::Object(map)
    }
}

impl fmt::Display for DecisionLog {
    /// One block per key: the key line, then one tag per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks: Vec<String> = self
            .entries
            .iter()
            .map(|(key, tags)| {
                let lines: Vec<String> = tags.iter().map(ToString::to_string).collect();
                format!("{}: \n{}\n", key, lines.join("\n"))
            })
            .collect();

        let file = self
            .last_saved_cache_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "None".to_string());
        let key = self.last_saved_cache_file_key().unwrap_or("None");
        blocks.push(format!("{}: \n{}\n", LAST_SAVED_FILE_KEY, file));
        blocks.push(format!("{}: \n{}\n", LAST_SAVED_KEY_KEY, key));

        write!(f, "{}", blocks.join("\n"))
    }
}
