//! Identity lookup: matched records, optional premium status, and optional
//! password recovery for each record.
//!
//! ```no_run
//! use leakmatch::config::FinderConfig;
//! use leakmatch::search::Finder;
//!
//! let finder = Finder::from_config(&FinderConfig::default());
//! let result = finder.search("alice", false, true);
//! for record in &result.records {
//!     println!("{} {:?}", record.source, record.cracked_password);
//! }
//! ```
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{FinderConfig, PASSWORD_FIELDS, SALT_FIELDS};
use crate::crack::{CrackEngine, CrackHit};
use crate::dictionary::DictionaryStore;
use crate::identity::{IdentityKey, IdentityRecord, IdentityStore};
use crate::premium::{PremiumLookup, PremiumStatus, Unconfigured};

/// Outcome of one lookup. An unknown identity yields empty `records`; there is
/// no separate not-found signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub identity: IdentityKey,
    pub records: Vec<IdentityRecord>,
    pub premium_info: Option<PremiumStatus>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.premium_info.is_none()
    }

    pub fn cracked(&self) -> impl Iterator<Item = &IdentityRecord> {
        self.records.iter().filter(|r| r.is_cracked())
    }
}

/// Composes the identity index, crack engine, and premium collaborator.
pub struct Finder {
    identities: IdentityStore,
    engine: CrackEngine,
    premium: Box<dyn PremiumLookup>,
    parallel: bool,
}

impl Finder {
    pub fn new(identities: IdentityStore, engine: CrackEngine) -> Self {
        Self {
            identities,
            engine,
            premium: Box::new(Unconfigured),
            parallel: false,
        }
    }

    /// Build the index from the data directory and point the crack engine at
    /// the wordlist directory. Missing directories degrade to empty results.
    pub fn from_config(config: &FinderConfig) -> Self {
        let mut identities = IdentityStore::new();
        let added = if config.parallel_ingest {
            identities.ingest_dir_parallel(&config.data_dir)
        } else {
            identities.ingest_dir(&config.data_dir)
        };
        info!(
            "indexed {} records for {} identities",
            added,
            identities.identity_count()
        );
        let dictionaries =
            DictionaryStore::from_dir(&config.wordlists_dir, config.mmap_threshold_bytes);
        Self::new(identities, CrackEngine::new(dictionaries)).with_parallel(config.parallel_crack)
    }

    pub fn with_premium<L: PremiumLookup + 'static>(mut self, lookup: L) -> Self {
        self.premium = Box::new(lookup);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn engine(&self) -> &CrackEngine {
        &self.engine
    }

    /// Look up `identity` (any case). Records are returned as independent
    /// copies; annotating them never touches the index.
    pub fn search(&self, identity: &str, check_premium: bool, attempt_crack: bool) -> SearchResult {
        let key = IdentityKey::new(identity);
        let mut records = self.identities.records_for(key.as_str()).to_vec();
        debug!("{} records matched {}", records.len(), key);

        let premium_info = if check_premium {
            Some(self.premium_status(&key))
        } else {
            None
        };

        if attempt_crack {
            for record in &mut records {
                self.annotate(record);
            }
        }

        SearchResult {
            identity: key,
            records,
            premium_info,
        }
    }

    fn premium_status(&self, key: &IdentityKey) -> PremiumStatus {
        match self.premium.check_status(key.as_str()) {
            Ok(status) => {
                if status.is_premium {
                    info!("{} is a premium account", key);
                } else {
                    debug!("{} is not a premium account", key);
                }
                status
            }
            Err(e) => {
                warn!("premium check for {} failed: {}", key, e);
                PremiumStatus::failed(e.to_string())
            }
        }
    }

    fn annotate(&self, record: &mut IdentityRecord) {
        let Some(hash) = crack_target(record) else {
            return;
        };
        let salt = SALT_FIELDS
            .iter()
            .find_map(|f| record.text_field(f))
            .unwrap_or_default();
        let hit = if self.parallel {
            self.engine.crack_with_all_dictionaries_parallel(&hash, &salt)
        } else {
            self.engine.crack_with_all_dictionaries(&hash, &salt)
        };
        if let Some(CrackHit {
            plaintext,
            wordlist,
        }) = hit
        {
            info!("recovered password from {} using {}", record.source, wordlist);
            record.cracked_password = Some(plaintext);
            record.wordlist_used = Some(wordlist);
        }
    }
}

/// Name of the first password-like field present on the record.
pub fn crack_field(record: &IdentityRecord) -> Option<&'static str> {
    PASSWORD_FIELDS
        .iter()
        .copied()
        .find(|f| record.fields.contains_key(*f))
}

/// Value of [`crack_field`]. A present but empty or structured field ends the
/// search; later fields are not tried.
pub fn crack_target(record: &IdentityRecord) -> Option<String> {
    record.text_field(crack_field(record)?)
}
