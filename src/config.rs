//! Field-name tables and runtime settings.
use std::path::PathBuf;

use crate::io::DEFAULT_MMAP_THRESHOLD_BYTES;

/// Identity-like keys, highest priority first.
pub const IDENTITY_FIELDS: &[&str] = &["name", "username", "user", "correo", "email", "login"];

/// Password-like keys, highest priority first. Only the first present one is
/// used as the crack target.
pub const PASSWORD_FIELDS: &[&str] = &[
    "password",
    "hash",
    "password_hash",
    "contrasena",
    "passwd",
    "clave",
    "clave_hash",
    "pass",
    "pwd",
];

/// Keys holding a per-record salt.
pub const SALT_FIELDS: &[&str] = &["salt"];

/// Extension of source files picked up from the data directory.
pub const SOURCE_EXTENSION: &str = "json";

/// Key used to wrap scalar values of identity-keyed objects.
pub const SCALAR_VALUE_FIELD: &str = "value";

pub const RECOVERED_MARKER_FIELD: &str = "partial";
pub const RECOVERED_MARKER_VALUE: &str = "data_recovered";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    pub data_dir: PathBuf,
    pub wordlists_dir: PathBuf,
    /// Wordlists at or above this size are memory-mapped. `u64::MAX` disables
    /// mmap.
    pub mmap_threshold_bytes: u64,
    /// Fan wordlist scans out over the rayon pool.
    pub parallel_crack: bool,
    /// Parse source files on the rayon pool.
    pub parallel_ingest: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            wordlists_dir: PathBuf::from("wordlists"),
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD_BYTES,
            parallel_crack: false,
            parallel_ingest: false,
        }
    }
}

impl FinderConfig {
    /// Map a user-facing threshold where `0` means "never mmap".
    pub fn threshold_from_arg(bytes: u64) -> u64 {
        if bytes == 0 { u64::MAX } else { bytes }
    }
}
