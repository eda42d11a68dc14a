//! Wordlist loading and caching.
//!
//! A [`DictionaryStore`] reads candidate passwords through a [`WordlistSource`]
//! and keeps each list in memory for the rest of the process. The first load of
//! a name populates the cache; later loads return the same shared list.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};

use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, iter_lines_auto};

pub type Wordlist = Arc<Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("wordlist not found: {0}")]
    NotFound(String),
    #[error("failed to read wordlist {name}: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("failed to list wordlists in {dir}: {reason}")]
    Listing { dir: String, reason: String },
}

/// Where wordlists come from. Listing order is authoritative for tie-breaks.
pub trait WordlistSource: Send + Sync {
    /// Names of the available wordlists, in enumeration order. A missing or
    /// empty location yields an empty list.
    fn list(&self) -> Result<Vec<String>, DictionaryError>;

    /// Read every candidate of `name`, in file order.
    fn read(&self, name: &str) -> Result<Vec<String>, DictionaryError>;
}

/// Wordlists stored as files in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    mmap_threshold_bytes: u64,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_threshold(root, DEFAULT_MMAP_THRESHOLD_BYTES)
    }

    pub fn with_threshold<P: AsRef<Path>>(root: P, mmap_threshold_bytes: u64) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mmap_threshold_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WordlistSource for DirectorySource {
    fn list(&self) -> Result<Vec<String>, DictionaryError> {
        if !self.root.is_dir() {
            warn!("wordlist directory not found: {}", self.root.display());
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| DictionaryError::Listing {
            dir: self.root.display().to_string(),
            reason: e.to_string(),
        })?;
        // read_dir order is kept as-is; no sort is applied
        let names: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        if names.is_empty() {
            warn!("no wordlists found in {}", self.root.display());
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<String>, DictionaryError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(DictionaryError::NotFound(name.to_string()));
        }
        let lines = iter_lines_auto(&path, self.mmap_threshold_bytes)
            .map_err(|e| unreadable(name, format!("{:#}", e)))?;
        lines
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(|e| unreadable(name, e.to_string()))
    }
}

fn unreadable(name: &str, reason: String) -> DictionaryError {
    DictionaryError::Unreadable {
        name: name.to_string(),
        reason,
    }
}

/// Wordlists held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lists: Vec<(String, Vec<String>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list<I, S>(mut self, name: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .push((name.to_string(), words.into_iter().map(Into::into).collect()));
        self
    }
}

impl WordlistSource for MemorySource {
    fn list(&self) -> Result<Vec<String>, DictionaryError> {
        Ok(self.lists.iter().map(|(n, _)| n.clone()).collect())
    }

    fn read(&self, name: &str) -> Result<Vec<String>, DictionaryError> {
        self.lists
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, words)| words.clone())
            .ok_or_else(|| DictionaryError::NotFound(name.to_string()))
    }
}

/// Lazily populated, never evicted cache of wordlists by name.
pub struct DictionaryStore {
    source: Box<dyn WordlistSource>,
    cache: RwLock<HashMap<String, Wordlist>>,
}

impl DictionaryStore {
    pub fn new<S: WordlistSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Convenience constructor for a wordlist directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P, mmap_threshold_bytes: u64) -> Self {
        Self::new(DirectorySource::with_threshold(dir, mmap_threshold_bytes))
    }

    /// Names of all available wordlists in enumeration order. Listing
    /// failures are logged and reported as no wordlists.
    pub fn list_available(&self) -> Vec<String> {
        match self.source.list() {
            Ok(names) => names,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Load `name`, reading it only on the first call. Concurrent first loads
    /// of the same name settle on whichever insertion lands first.
    pub fn load(&self, name: &str) -> Result<Wordlist, DictionaryError> {
        if let Some(words) = self.cached(name) {
            return Ok(words);
        }
        let words = Arc::new(self.source.read(name)?);
        info!("wordlist {} loaded with {} words", name, words.len());
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(words)))
    }

    /// Whether `name` is already in the cache.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    fn cached(&self, name: &str) -> Option<Wordlist> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let hit = cache.get(name).cloned();
        if hit.is_some() {
            debug!("wordlist {} served from cache", name);
        }
        hit
    }
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DictionaryStore")
            .field("loaded", &cache.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingSource {
        inner: MemorySource,
        reads: Arc<AtomicUsize>,
    }

    impl WordlistSource for CountingSource {
        fn list(&self) -> Result<Vec<String>, DictionaryError> {
            self.inner.list()
        }
        fn read(&self, name: &str) -> Result<Vec<String>, DictionaryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(name)
        }
    }

    #[test]
    fn load_reads_once_and_shares_the_list() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = DictionaryStore::new(CountingSource {
            inner: MemorySource::new().with_list("common.txt", ["a", "b"]),
            reads: Arc::clone(&reads),
        });
        assert!(!store.is_loaded("common.txt"));
        let first = store.load("common.txt").unwrap();
        let second = store.load("common.txt").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(first.as_slice(), ["a", "b"]);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = DictionaryStore::from_dir(dir.path().join("nope"), u64::MAX);
        assert!(store.list_available().is_empty());
        assert!(matches!(
            store.load("rockyou.txt"),
            Err(DictionaryError::NotFound(_))
        ));
    }

    #[test]
    fn directory_source_lists_files_and_trims_terminators() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("w.txt"), b"one\r\ntw\xffo\nthree\n").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let store = DictionaryStore::from_dir(dir.path(), u64::MAX);
        assert_eq!(store.list_available(), vec!["w.txt".to_string()]);
        let words = store.load("w.txt").unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], "one");
        assert_eq!(words[1], "tw\u{fffd}o");
        assert_eq!(words[2], "three");
    }

    #[test]
    fn memory_source_keeps_insertion_order() {
        let src = MemorySource::new()
            .with_list("b.txt", ["x"])
            .with_list("a.txt", ["y"]);
        assert_eq!(src.list().unwrap(), vec!["b.txt", "a.txt"]);
    }
}
