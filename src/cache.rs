//! Per-document persistence: bookmarks and the last narrated position.
//!
//! Files live under the configured cache directory, in a folder named by the
//! SHA-256 of the document path to avoid filesystem issues. Both files are
//! small TOML documents. The recent-documents list sits at the cache root as
//! `history.json` (see [`crate::history`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const BOOKMARKS_FILE: &str = "bookmarks.toml";
const POSITION_FILE: &str = "position.toml";
const HISTORY_FILE: &str = "history.json";

/// A saved character position in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
}

impl Bookmark {
    pub fn new(position: usize, label: Option<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        Self {
            position,
            label: label.filter(|label| !label.trim().is_empty()),
            created_at,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct BookmarkFile {
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
}

#[derive(Serialize, Deserialize)]
struct PositionEntry {
    position: usize,
}

#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding everything cached for `document`.
    pub fn hash_dir(&self, document: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(document.as_os_str().to_string_lossy().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(hash)
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Saved bookmarks, oldest first. Missing or unreadable files yield none.
    pub fn load_bookmarks(&self, document: &Path) -> Vec<Bookmark> {
        let path = self.hash_dir(document).join(BOOKMARKS_FILE);
        let Ok(data) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match toml::from_str::<BookmarkFile>(&data) {
            Ok(file) => file.bookmarks,
            Err(err) => {
                warn!(path = %path.display(), "Ignoring unreadable bookmarks: {err}");
                Vec::new()
            }
        }
    }

    pub fn save_bookmarks(&self, document: &Path, bookmarks: &[Bookmark]) -> Result<()> {
        let path = self.hash_dir(document).join(BOOKMARKS_FILE);
        let file = BookmarkFile {
            bookmarks: bookmarks.to_vec(),
        };
        let contents = toml::to_string(&file).context("Serializing bookmarks")?;
        write_file(&path, &contents)?;
        debug!(path = %path.display(), count = bookmarks.len(), "Saved bookmarks");
        Ok(())
    }

    pub fn load_position(&self, document: &Path) -> Option<usize> {
        let path = self.hash_dir(document).join(POSITION_FILE);
        let data = fs::read_to_string(path).ok()?;
        let entry: PositionEntry = toml::from_str(&data).ok()?;
        Some(entry.position)
    }

    /// Persist the last position. Failures are logged, not returned, so a
    /// read-only cache never interrupts narration.
    pub fn save_position(&self, document: &Path, position: usize) {
        let path = self.hash_dir(document).join(POSITION_FILE);
        let result = toml::to_string(&PositionEntry { position })
            .context("Serializing position")
            .and_then(|contents| write_file(&path, &contents));
        if let Err(err) = result {
            warn!(path = %path.display(), "Failed to save position: {err:#}");
        }
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating cache directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_dir_is_stable_per_document() {
        let cache = Cache::new("/tmp/cache-root");
        let a = cache.hash_dir(Path::new("/books/a.pdf"));
        assert_eq!(a, cache.hash_dir(Path::new("/books/a.pdf")));
        assert_ne!(a, cache.hash_dir(Path::new("/books/b.pdf")));
        assert!(a.starts_with("/tmp/cache-root"));
    }

    #[test]
    fn bookmarks_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let doc = Path::new("/books/novel.pdf");
        assert!(cache.load_bookmarks(doc).is_empty());

        let marks = vec![
            Bookmark::new(120, Some("good bit".to_string())),
            Bookmark::new(4_000, None),
        ];
        cache.save_bookmarks(doc, &marks).unwrap();
        assert_eq!(cache.load_bookmarks(doc), marks);
        assert!(cache.load_bookmarks(Path::new("/books/other.pdf")).is_empty());
    }

    #[test]
    fn corrupt_bookmarks_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let doc = Path::new("doc.pdf");
        write_file(&cache.hash_dir(doc).join(BOOKMARKS_FILE), "not = [valid").unwrap();
        assert!(cache.load_bookmarks(doc).is_empty());
    }

    #[test]
    fn position_is_saved_and_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().join("nested"));
        let doc = Path::new("doc.txt");
        assert_eq!(cache.load_position(doc), None);
        cache.save_position(doc, 42);
        cache.save_position(doc, 99);
        assert_eq!(cache.load_position(doc), Some(99));
    }

    #[test]
    fn blank_labels_are_dropped() {
        assert_eq!(Bookmark::new(1, Some("   ".to_string())).label, None);
    }
}
