//! Persistent record of dispatched article identifiers.
//!
//! ## File Layout
//!
//! ```text
//! {
//!   "https://example.com/articles/abc": {
//!     "title": "Sunday Preview",
//!     "category": "Warhammer 40,000",
//!     "posted_at": "2024-06-05T10:00:00Z"
//!   }
//! }
//! ```
//!
//! Bare `true` markers and a plain JSON array of identifiers are accepted on
//! load and carried through on save. Identifiers are never removed.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ResolvedArticle;

/// Details kept for a dispatched article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
}

impl HistoryEntry {
    /// Entry for an article marked now.
    pub fn for_article(article: &ResolvedArticle) -> Self {
        Self {
            title: Some(article.candidate.title.clone()),
            category: article.candidate.category.clone(),
            posted_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// Value stored under an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeenMarker {
    Entry(HistoryEntry),
    /// Anything else found in an older file, kept verbatim
    Other(serde_json::Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Map(BTreeMap<String, SeenMarker>),
    List(Vec<String>),
}

impl From<HistoryFile> for BTreeMap<String, SeenMarker> {
    fn from(file: HistoryFile) -> Self {
        match file {
            HistoryFile::Map(map) => map,
            HistoryFile::List(ids) => ids
                .into_iter()
                .map(|id| (id, SeenMarker::Other(serde_json::Value::Bool(true))))
                .collect(),
        }
    }
}

/// Set of identifiers already dispatched, backed by a JSON file.
///
/// Single writer: one process, one cycle at a time.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    entries: BTreeMap<String, SeenMarker>,
    dirty: bool,
}

impl HistoryStore {
    /// Load the store from `path`.
    ///
    /// A missing file is an empty history. An unreadable or corrupt file is
    /// also treated as empty (with a warning); a corrupt file is moved aside
    /// to `<path>.corrupt` so it is not silently overwritten.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with(path.into(), true)
    }

    /// Load for inspection only: same tolerance as [`HistoryStore::load`],
    /// but a corrupt file is left where it is.
    pub fn read(path: impl Into<PathBuf>) -> Self {
        Self::load_with(path.into(), false)
    }

    fn load_with(path: PathBuf, quarantine: bool) -> Self {
        let entries = match Self::read_entries(&path) {
            Ok(Some(entries)) => {
                log::info!("Loaded {} history entries from {}", entries.len(), path.display());
                entries
            }
            Ok(None) => {
                log::info!("No history at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(AppError::Json(e)) => {
                log::warn!("History file {} is corrupt ({}), starting empty", path.display(), e);
                if quarantine {
                    Self::quarantine(&path);
                }
                BTreeMap::new()
            }
            Err(e) => {
                log::warn!("History file {} unreadable ({}), starting empty", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries,
            dirty: false,
        }
    }

    /// Empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    fn read_entries(path: &Path) -> Result<Option<BTreeMap<String, SeenMarker>>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(BTreeMap::new()));
        }
        let file: HistoryFile = serde_json::from_slice(&bytes)?;
        Ok(Some(file.into()))
    }

    fn quarantine(path: &Path) {
        let mut aside = path.as_os_str().to_owned();
        aside.push(".corrupt");
        if let Err(e) = fs::rename(path, &aside) {
            log::warn!("Could not move corrupt history aside: {}", e);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether there are additions not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Record an identifier. Returns `false` if it was already present,
    /// in which case the existing marker is left untouched.
    pub fn add(&mut self, id: impl Into<String>, entry: HistoryEntry) -> bool {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, SeenMarker::Entry(entry));
        self.dirty = true;
        true
    }

    pub fn get(&self, id: &str) -> Option<&SeenMarker> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SeenMarker)> {
        self.entries.iter()
    }

    /// Persist the full set atomically (write temp, flush, fsync, rename).
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        log::debug!("Saved {} history entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Save only when something was added since the last save.
    pub fn save_if_dirty(&mut self) -> Result<()> {
        if self.dirty { self.save() } else { Ok(()) }
    }

    /// Open a scope that reconciles memory and disk when it ends.
    pub fn session(&mut self) -> HistorySession<'_> {
        HistorySession {
            store: self,
            committed: false,
        }
    }
}

/// Scope guard over a [`HistoryStore`] for one cycle.
///
/// `commit` saves and reports the outcome. If the scope is left any other
/// way (early return, `?`, panic) the guard saves on drop and logs failures.
pub struct HistorySession<'a> {
    store: &'a mut HistoryStore,
    committed: bool,
}

impl HistorySession<'_> {
    /// Flush pending additions and end the scope.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        self.store.save_if_dirty()
    }
}

impl Deref for HistorySession<'_> {
    type Target = HistoryStore;

    fn deref(&self) -> &HistoryStore {
        &*self.store
    }
}

impl DerefMut for HistorySession<'_> {
    fn deref_mut(&mut self) -> &mut HistoryStore {
        &mut *self.store
    }
}

impl Drop for HistorySession<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.store.save_if_dirty() {
            log::warn!(
                "Failed to flush history to {}: {}. Keeping it in memory.",
                self.store.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(title: &str) -> HistoryEntry {
        HistoryEntry {
            title: Some(title.to_string()),
            ..HistoryEntry::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::load(tmp.path().join("nope.json"));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_add_save_reload_contains() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");

        let mut store = HistoryStore::load(&path);
        assert!(store.add("https://example.com/a", entry("A")));
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());

        let reloaded = HistoryStore::load(&path);
        assert!(reloaded.contains("https://example.com/a"));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get("https://example.com/a"),
            Some(&SeenMarker::Entry(entry("A")))
        );
    }

    #[test]
    fn test_add_is_monotonic() {
        let tmp = TempDir::new().unwrap();
        let mut store = HistoryStore::empty(tmp.path().join("h.json"));

        assert!(store.add("id", entry("first")));
        assert!(!store.add("id", entry("second")));
        assert_eq!(store.get("id"), Some(&SeenMarker::Entry(entry("first"))));
    }

    #[test]
    fn test_corrupt_file_is_empty_and_moved_aside() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = HistoryStore::load(&path);
        assert!(store.is_empty());
        assert!(!path.exists());
        assert!(tmp.path().join("history.json.corrupt").exists());
    }

    #[test]
    fn test_read_leaves_corrupt_file_in_place() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = HistoryStore::read(&path);
        assert!(store.is_empty());
        assert_eq!(fs::read(&path).unwrap(), b"{ not json");
        assert!(!tmp.path().join("history.json.corrupt").exists());
    }

    #[test]
    fn test_read_sees_saved_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let mut store = HistoryStore::empty(&path);
        store.add("id", entry("first"));
        store.save().unwrap();

        assert!(HistoryStore::read(&path).contains("id"));
    }

    #[test]
    fn test_blank_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, b"\n").unwrap();

        assert!(HistoryStore::load(&path).is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_legacy_formats_survive_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(
            &path,
            r#"{
                "https://example.com/old": true,
                "https://example.com/py": {
                    "title": "From the old bot",
                    "category": "Unknown",
                    "posted_at": "2024-03-12T10:11:12.123456"
                },
                "https://example.com/odd": {"title": 5}
            }"#,
        )
        .unwrap();

        let mut store = HistoryStore::load(&path);
        assert_eq!(store.len(), 3);
        store.add("https://example.com/new", entry("New"));
        store.save().unwrap();

        let reloaded = HistoryStore::load(&path);
        for id in ["old", "py", "odd", "new"] {
            assert!(reloaded.contains(&format!("https://example.com/{id}")));
        }
        assert_eq!(
            reloaded.get("https://example.com/old"),
            Some(&SeenMarker::Other(serde_json::Value::Bool(true)))
        );
    }

    #[test]
    fn test_plain_list_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, r#"["https://example.com/a", "https://example.com/b"]"#).unwrap();

        let store = HistoryStore::load(&path);
        assert!(store.contains("https://example.com/a"));
        assert!(store.contains("https://example.com/b"));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/nested/history.json");

        let mut store = HistoryStore::empty(&path);
        store.add("id", HistoryEntry::default());
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_session_drop_flushes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let mut store = HistoryStore::empty(&path);

        {
            let mut session = store.session();
            session.add("dropped", entry("x"));
        }

        assert!(!store.is_dirty());
        assert!(HistoryStore::load(&path).contains("dropped"));
    }

    #[test]
    fn test_session_commit_reports_errors() {
        let tmp = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = tmp.path().join("history.json");
        fs::create_dir_all(path.join("child")).unwrap();

        let mut store = HistoryStore::empty(&path);
        let mut session = store.session();
        session.add("id", entry("x"));
        assert!(session.commit().is_err());

        assert!(store.contains("id"));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_clean_session_does_not_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let mut store = HistoryStore::empty(&path);

        store.session().commit().unwrap();
        assert!(!path.exists());
    }
}
