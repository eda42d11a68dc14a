pub mod classify;
pub mod config;
pub mod crack;
pub mod dictionary;
pub mod export;
pub mod identity;
pub mod io;
pub mod premium;
pub mod report;
pub mod search;
pub mod stats;
pub mod targets;

pub mod prelude {
    pub use crate::classify::{DigestTag, classify};
    pub use crate::crack::{CrackEngine, CrackHit};
    pub use crate::dictionary::DictionaryStore;
    pub use crate::identity::{IdentityRecord, IdentityStore};
    pub use crate::search::{Finder, SearchResult};
}
