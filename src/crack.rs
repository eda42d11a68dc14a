//! Dictionary attack over single-pass digests, with memoized outcomes.
//!
//! Every `(hash, salt, wordlist)` triple is scanned at most once per engine:
//! both "found" and "exhausted without a match" are cached. Scans that are
//! cancelled part-way never leave a cache entry behind. Concurrent callers
//! for the same triple wait on one scan instead of repeating it.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{DigestMatcher, DigestTag, classify};
use crate::dictionary::DictionaryStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CrackKey {
    hash: String,
    salt: String,
    wordlist: String,
}

/// A recovered plaintext and the wordlist it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrackHit {
    pub plaintext: String,
    pub wordlist: String,
}

/// Cooperative cancellation flag, checked between candidates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum ScanOutcome {
    Found(String),
    Exhausted,
    Cancelled,
}

/// Memoized results by `(hash, salt, wordlist)`. `None` records a confirmed
/// miss.
#[derive(Debug, Default)]
pub struct CrackResultCache {
    entries: RwLock<HashMap<CrackKey, Option<String>>>,
}

impl CrackResultCache {
    fn get(&self, key: &CrackKey) -> Option<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Insert unless present; returns the value that ends up stored.
    fn settle(&self, key: CrackKey, value: Option<String>) -> Option<String> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(value).clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct CrackEngine {
    dictionaries: DictionaryStore,
    results: CrackResultCache,
    gates: Mutex<HashMap<CrackKey, Arc<Mutex<()>>>>,
    scans: AtomicU64,
}

impl CrackEngine {
    pub fn new(dictionaries: DictionaryStore) -> Self {
        Self {
            dictionaries,
            results: CrackResultCache::default(),
            gates: Mutex::new(HashMap::new()),
            scans: AtomicU64::new(0),
        }
    }

    pub fn dictionaries(&self) -> &DictionaryStore {
        &self.dictionaries
    }

    pub fn results(&self) -> &CrackResultCache {
        &self.results
    }

    /// Number of wordlist scans actually started (cache hits excluded).
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Try one wordlist against `hash`. Returns the first candidate whose
    /// digest with `salt` appended matches.
    pub fn crack_with_dictionary(&self, hash: &str, salt: &str, wordlist: &str) -> Option<String> {
        self.crack_with_dictionary_until(hash, salt, wordlist, &|| false)
    }

    /// Like [`Self::crack_with_dictionary`] but stops early once `token` is
    /// cancelled. A cancelled scan returns `None` and is not cached.
    pub fn crack_with_dictionary_cancellable(
        &self,
        hash: &str,
        salt: &str,
        wordlist: &str,
        token: &CancelToken,
    ) -> Option<String> {
        self.crack_with_dictionary_until(hash, salt, wordlist, &|| token.is_cancelled())
    }

    /// Try every available wordlist in enumeration order; stop at the first
    /// match.
    pub fn crack_with_all_dictionaries(&self, hash: &str, salt: &str) -> Option<CrackHit> {
        let (tag, names) = self.plan(hash)?;
        debug!("trying {} wordlists for {} hash", names.len(), tag);
        names.into_iter().find_map(|wordlist| {
            self.crack_with_dictionary(hash, salt, &wordlist)
                .map(|plaintext| CrackHit {
                    plaintext,
                    wordlist,
                })
        })
    }

    /// One rayon task per wordlist. When several wordlists match, the one
    /// earliest in enumeration order is reported; scans of later wordlists
    /// are cancelled once an earlier one has matched.
    pub fn crack_with_all_dictionaries_parallel(
        &self,
        hash: &str,
        salt: &str,
    ) -> Option<CrackHit> {
        let (tag, names) = self.plan(hash)?;
        debug!("fanning out {} wordlists for {} hash", names.len(), tag);
        let best = AtomicUsize::new(usize::MAX);
        let found: Vec<Option<String>> = names
            .par_iter()
            .enumerate()
            .map(|(idx, wordlist)| {
                let superseded = || best.load(Ordering::Acquire) < idx;
                if superseded() {
                    return None;
                }
                let hit = self.crack_with_dictionary_until(hash, salt, wordlist, &superseded);
                if hit.is_some() {
                    best.fetch_min(idx, Ordering::AcqRel);
                }
                hit
            })
            .collect();
        let idx = best.into_inner();
        let plaintext = found.into_iter().nth(idx).flatten()?;
        Some(CrackHit {
            plaintext,
            wordlist: names[idx].clone(),
        })
    }

    /// Classify and list wordlists; `None` when nothing can be attempted.
    fn plan(&self, hash: &str) -> Option<(DigestTag, Vec<String>)> {
        let names = self.dictionaries.list_available();
        if names.is_empty() {
            return None;
        }
        let tag = classify(hash);
        if !tag.is_actionable() {
            debug!("hash type {} is not crackable, skipping", tag);
            return None;
        }
        info!("detected hash type {}", tag);
        Some((tag, names))
    }

    fn crack_with_dictionary_until(
        &self,
        hash: &str,
        salt: &str,
        wordlist: &str,
        stop: &(dyn Fn() -> bool + Sync),
    ) -> Option<String> {
        let key = CrackKey {
            hash: hash.to_string(),
            salt: salt.to_string(),
            wordlist: wordlist.to_string(),
        };
        if let Some(cached) = self.results.get(&key) {
            return cached;
        }

        let tag = classify(hash);
        let Some(matcher) = tag.matcher(hash) else {
            return self.results.settle(key, None);
        };

        let gate = self.gate(&key);
        let _scanning = gate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = self.results.get(&key) {
            return cached;
        }

        let words = match self.dictionaries.load(wordlist) {
            Ok(words) => words,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        self.scans.fetch_add(1, Ordering::Relaxed);
        debug!(
            "scanning {} words of {} for {} hash {}",
            words.len(),
            wordlist,
            tag,
            preview(hash)
        );
        match scan(&matcher, salt, &words, stop) {
            ScanOutcome::Found(word) => {
                info!("hash {} cracked with {}", preview(hash), wordlist);
                self.results.settle(key, Some(word))
            }
            ScanOutcome::Exhausted => self.results.settle(key, None),
            ScanOutcome::Cancelled => None,
        }
    }

    /// Per-key lock held for the duration of a scan.
    fn gate(&self, key: &CrackKey) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(key.clone()).or_default())
    }
}

fn scan(
    matcher: &DigestMatcher,
    salt: &str,
    words: &[String],
    stop: &(dyn Fn() -> bool + Sync),
) -> ScanOutcome {
    for word in words {
        if stop() {
            return ScanOutcome::Cancelled;
        }
        if matcher.matches(word, salt) {
            return ScanOutcome::Found(word.clone());
        }
    }
    ScanOutcome::Exhausted
}

fn preview(hash: &str) -> &str {
    match hash.char_indices().nth(10) {
        Some((i, _)) => &hash[..i],
        None => hash,
    }
}
