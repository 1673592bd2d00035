//! Line-oriented entry store
//!
//! The backing file is UTF-8 text with one record per line:
//! `path|rank|last_access`. The separator is not escaped; paths containing
//! `|` are unsupported by the format and such lines fail validation.

use crate::{HopError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

/// Field separator in the backing file. Not permitted inside paths.
pub const SEPARATOR: char = '|';

/// One tracked directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path, unique key within the store.
    pub path: String,
    /// Visit weight: 1 on first visit, +1 per visit, decayed globally.
    pub rank: f64,
    /// Unix timestamp of the most recent visit.
    pub last_access: i64,
}

impl Entry {
    pub fn new(path: impl Into<String>, rank: f64, last_access: i64) -> Self {
        Self {
            path: path.into(),
            rank,
            last_access,
        }
    }

    /// Parse one record line. `line_no` is 1-based, for error reporting.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self> {
        let mut fields = line.splitn(3, SEPARATOR);
        let (path, rank, last_access) = match (fields.next(), fields.next(), fields.next()) {
            (Some(p), Some(r), Some(t)) => (p, r, t),
            _ => {
                return Err(HopError::MalformedEntry {
                    line: line_no,
                    reason: format!("expected 3 fields separated by {:?}", SEPARATOR),
                })
            }
        };
        if path.is_empty() {
            return Err(HopError::MalformedEntry {
                line: line_no,
                reason: "empty path".to_string(),
            });
        }
        let rank: f64 = rank.parse().map_err(|_| HopError::MalformedEntry {
            line: line_no,
            reason: format!("invalid rank {:?}", rank),
        })?;
        if !rank.is_finite() || rank < 0.0 {
            return Err(HopError::MalformedEntry {
                line: line_no,
                reason: format!("rank {} out of range", rank),
            });
        }
        let last_access: i64 = last_access.parse().map_err(|_| HopError::MalformedEntry {
            line: line_no,
            reason: format!("invalid timestamp {:?}", last_access),
        })?;
        Ok(Self::new(path, rank, last_access))
    }

    /// Render as a record line, without trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.path, SEPARATOR, self.rank, SEPARATOR, self.last_access
        )
    }
}

/// Unordered mapping from path to entry, loaded and written wholesale.
#[derive(Debug, Clone, Default)]
pub struct Store {
    entries: HashMap<String, Entry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`.
    ///
    /// A missing file is an empty store. A directory at the configured path
    /// is a fatal configuration error. Lines that fail validation are
    /// skipped with a warning so one corrupt record cannot take out the
    /// whole history.
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Err(HopError::DataFileIsDirectory(path.to_path_buf()));
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::parse(&content))
    }

    /// Parse store content, dropping malformed lines.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match Entry::parse_line(line, idx + 1) {
                Ok(entry) => {
                    entries.insert(entry.path.clone(), entry);
                }
                Err(e) => warn!("skipping data file line: {}", e),
            }
        }
        Self { entries }
    }

    /// Render all entries as backing-file content.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.values() {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        self.entries.remove(path)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Entry) -> bool) {
        self.entries.retain(|_, entry| keep(entry));
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all ranks, the input to the decay trigger.
    pub fn rank_sum(&self) -> f64 {
        self.entries.values().map(|e| e.rank).sum()
    }
}
