//! Recently opened documents, most recent first.

use crate::cache::write_file;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub text: String,
}

/// Bounded recency list, deduplicated by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    limit: usize,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn find(&self, name: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Put `name` at the front, replacing any older entry with that name and
    /// dropping the oldest entries past the limit.
    pub fn record(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|entry| entry.name != name);
        self.entries.insert(
            0,
            HistoryEntry {
                name,
                text: text.into(),
            },
        );
        self.entries.truncate(self.limit);
    }

    /// Read the list from disk; a missing or broken file gives an empty list.
    pub fn load(path: &Path, limit: usize) -> Self {
        let mut history = Self::new(limit);
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), "No history loaded: {err}");
                return history;
            }
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&data) {
            Ok(mut entries) => {
                entries.truncate(limit);
                history.entries = entries;
            }
            Err(err) => warn!(path = %path.display(), "Ignoring unreadable history: {err}"),
        }
        history
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(&self.entries).context("Serializing history")?;
        write_file(path, &contents)
    }
}
