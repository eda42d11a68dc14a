//! Identity records aggregated across data sources.
//!
//! Source files are JSON arrays of objects, JSON objects keyed by identity, or
//! something malformed. Malformed files go through a line-oriented recovery
//! pass that salvages what it can; placeholder records produced by its textual
//! fallback carry [`RecordOrigin::Recovered`] so they can be told apart from
//! cleanly parsed ones.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{
    IDENTITY_FIELDS, RECOVERED_MARKER_FIELD, RECOVERED_MARKER_VALUE, SCALAR_VALUE_FIELD,
    SOURCE_EXTENSION,
};
use crate::io::read_lossy;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read source {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Case-folded identity used to correlate records across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    Parsed,
    Recovered,
}

/// One source's view of an identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityRecord {
    pub fields: Map<String, Value>,
    pub source: String,
    pub origin: RecordOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cracked_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordlist_used: Option<String>,
}

impl IdentityRecord {
    pub fn new(fields: Map<String, Value>, source: &str) -> Self {
        Self {
            fields,
            source: source.to_string(),
            origin: RecordOrigin::Parsed,
            cracked_password: None,
            wordlist_used: None,
        }
    }

    /// Placeholder for an identity salvaged from an unparseable line.
    pub fn recovered(source: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(
            RECOVERED_MARKER_FIELD.to_string(),
            Value::String(RECOVERED_MARKER_VALUE.to_string()),
        );
        Self {
            origin: RecordOrigin::Recovered,
            ..Self::new(fields, source)
        }
    }

    /// String form of a scalar field; `None` for missing, null, empty, or
    /// structured values.
    pub fn text_field(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(scalar_text)
    }

    pub fn is_cracked(&self) -> bool {
        self.cracked_password.is_some()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Identity from the first populated identity-like field.
fn identity_of(item: &Map<String, Value>) -> Option<String> {
    IDENTITY_FIELDS
        .iter()
        .find_map(|field| item.get(*field).and_then(scalar_text))
}

/// Counters accumulated across ingestion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Sources read.
    pub sources: usize,
    /// Records from well-formed JSON or lines that parsed on their own.
    pub parsed: usize,
    /// Placeholder records from the textual fallback.
    pub recovered: usize,
    /// Array elements or lines that carried no identity.
    pub skipped: usize,
    /// Sources whose top-level JSON failed to parse.
    pub malformed_sources: usize,
    /// Lines the recovery pass could not use at all.
    pub unrecoverable_lines: usize,
}

impl ParseStats {
    pub fn added(&self) -> usize {
        self.parsed + self.recovered
    }

    fn merge(&mut self, other: &ParseStats) {
        self.sources += other.sources;
        self.parsed += other.parsed;
        self.recovered += other.recovered;
        self.skipped += other.skipped;
        self.malformed_sources += other.malformed_sources;
        self.unrecoverable_lines += other.unrecoverable_lines;
    }
}

/// Result of parsing one source, before it is appended to the index.
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub entries: Vec<(IdentityKey, IdentityRecord)>,
    pub stats: ParseStats,
}

impl ParsedSource {
    fn push(&mut self, identity: &str, record: IdentityRecord) {
        match record.origin {
            RecordOrigin::Parsed => self.stats.parsed += 1,
            RecordOrigin::Recovered => self.stats.recovered += 1,
        }
        self.entries.push((IdentityKey::new(identity), record));
    }
}

/// Parse one source's raw content. Never fails: JSON-shape problems are
/// absorbed by the recovery pass.
pub fn parse_source(source: &str, content: &str) -> ParsedSource {
    let mut out = ParsedSource::default();
    out.stats.sources = 1;
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(obj) => match identity_of(&obj) {
                        Some(id) => out.push(&id, IdentityRecord::new(obj, source)),
                        None => out.stats.skipped += 1,
                    },
                    _ => out.stats.skipped += 1,
                }
            }
        }
        Ok(Value::Object(obj)) => {
            for (id, value) in obj {
                let fields = match value {
                    Value::Object(fields) => fields,
                    scalar => {
                        let mut fields = Map::new();
                        fields.insert(SCALAR_VALUE_FIELD.to_string(), scalar);
                        fields
                    }
                };
                out.push(&id, IdentityRecord::new(fields, source));
            }
        }
        Ok(_) => {}
        Err(e) => {
            warn!(
                "{} is not valid JSON ({}), attempting partial recovery",
                source, e
            );
            out.stats.malformed_sources = 1;
            recover_lines(source, content, &mut out);
            if out.stats.added() > 0 {
                info!("recovered {} records from {}", out.stats.added(), source);
            } else {
                warn!("could not recover any data from {}", source);
            }
        }
    }
    out
}

fn recover_lines(source: &str, content: &str, out: &mut ParsedSource) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => match identity_of(&obj) {
                Some(id) => out.push(&id, IdentityRecord::new(obj, source)),
                None => out.stats.skipped += 1,
            },
            Ok(_) => out.stats.skipped += 1,
            Err(_) => match salvage_identity(line) {
                Some(id) => out.push(&id, IdentityRecord::recovered(source)),
                None => out.stats.unrecoverable_lines += 1,
            },
        }
    }
}

/// Best-effort textual extraction: if the line mentions a quoted identity key,
/// take the quote-delimited segment two positions after it. May return garbage
/// (including an empty string) for oddly quoted input.
pub fn salvage_identity(line: &str) -> Option<String> {
    let mentions_key = IDENTITY_FIELDS
        .iter()
        .any(|field| line.contains(&format!("\"{}\"", field)));
    if !mentions_key {
        return None;
    }
    let parts: Vec<&str> = line.split('"').collect();
    parts.iter().enumerate().find_map(|(i, part)| {
        if IDENTITY_FIELDS.contains(part) && i + 2 < parts.len() {
            Some(parts[i + 2].to_string())
        } else {
            None
        }
    })
}

/// Index of identity records. Append-only: re-ingesting a source adds its
/// records again.
#[derive(Debug, Default)]
pub struct IdentityStore {
    index: HashMap<IdentityKey, Vec<IdentityRecord>>,
    stats: ParseStats,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest raw content for `source`; returns the number of records added.
    pub fn ingest(&mut self, source: &str, content: &str) -> usize {
        self.append(parse_source(source, content))
    }

    /// Ingest a single file, named by its file name.
    pub fn ingest_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, IngestError> {
        let (source, content) = read_source(path.as_ref())?;
        Ok(self.ingest(&source, &content))
    }

    /// Ingest every `*.json` file in `dir`, in directory order. Unreadable
    /// files are logged and skipped; a missing directory adds nothing.
    pub fn ingest_dir<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        let mut added = 0;
        for path in source_files(dir.as_ref()) {
            match self.ingest_file(&path) {
                Ok(n) => added += n,
                Err(e) => warn!("{}", e),
            }
        }
        added
    }

    /// Like [`Self::ingest_dir`] but reads and parses files on the rayon pool.
    /// Results are appended in directory order, so the index is the same as
    /// the sequential path would build.
    pub fn ingest_dir_parallel<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        let files = source_files(dir.as_ref());
        let parsed: Vec<Result<ParsedSource, IngestError>> = files
            .par_iter()
            .map(|path| read_source(path).map(|(source, content)| parse_source(&source, &content)))
            .collect();
        let mut added = 0;
        for result in parsed {
            match result {
                Ok(p) => added += self.append(p),
                Err(e) => warn!("{}", e),
            }
        }
        added
    }

    fn append(&mut self, parsed: ParsedSource) -> usize {
        let added = parsed.entries.len();
        for (key, record) in parsed.entries {
            self.index.entry(key).or_default().push(record);
        }
        self.stats.merge(&parsed.stats);
        added
    }

    /// Records for `identity` (any case), in ingestion order.
    pub fn records_for(&self, identity: &str) -> &[IdentityRecord] {
        self.index
            .get(&IdentityKey::new(identity))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn identity_count(&self) -> usize {
        self.index.len()
    }

    pub fn record_count(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    pub fn parse_stats(&self) -> ParseStats {
        self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &[IdentityRecord])> {
        self.index.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

fn read_source(path: &Path) -> Result<(String, String), IngestError> {
    let content = read_lossy(path).map_err(|e| IngestError::Unreadable {
        path: path.to_path_buf(),
        reason: format!("{:#}", e),
    })?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((source, content))
}

fn source_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("data directory {} unavailable: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
        })
        .collect();
    if files.is_empty() {
        warn!("no JSON sources found in {}", dir.display());
    } else {
        info!("loading {} sources from {}", files.len(), dir.display());
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_uses_first_populated_identity_field() {
        let content = r#"[
            {"name": "", "username": "Neo", "password": "x"},
            {"email": "trinity@example.com"},
            {"id": 7},
            "not an object"
        ]"#;
        let parsed = parse_source("a.json", content);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].0.as_str(), "neo");
        assert_eq!(parsed.entries[1].0.as_str(), "trinity@example.com");
        assert_eq!(parsed.stats.skipped, 2);
    }

    #[test]
    fn object_keyed_by_identity_wraps_scalars() {
        let mut store = IdentityStore::new();
        let n = store.ingest("o.json", r#"{"Morpheus": {"pwd": "abc"}, "oracle": 42}"#);
        assert_eq!(n, 2);
        let morpheus = store.records_for("morpheus");
        assert_eq!(morpheus.len(), 1);
        assert_eq!(morpheus[0].text_field("pwd").as_deref(), Some("abc"));
        let oracle = store.records_for("ORACLE");
        assert_eq!(oracle[0].fields.get("value"), Some(&Value::from(42)));
        assert_eq!(oracle[0].source, "o.json");
    }

    #[test]
    fn identities_fold_case() {
        let mut store = IdentityStore::new();
        store.ingest("one.json", r#"[{"user": "Alice", "a": 1}]"#);
        store.ingest("two.json", r#"[{"login": "ALICE", "b": 2}]"#);
        store.ingest("three.json", r#"{"alice": {"c": 3}}"#);
        assert_eq!(store.identity_count(), 1);
        for variant in ["Alice", "alice", "ALICE"] {
            let records = store.records_for(variant);
            let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
            assert_eq!(sources, vec!["one.json", "two.json", "three.json"]);
        }
    }

    #[test]
    fn reingesting_appends() {
        let mut store = IdentityStore::new();
        let content = r#"[{"username": "bob"}]"#;
        assert_eq!(store.ingest("s.json", content), 1);
        assert_eq!(store.ingest("s.json", content), 1);
        assert_eq!(store.records_for("bob").len(), 2);
        assert_eq!(store.parse_stats().sources, 2);
    }

    #[test]
    fn recovery_salvages_good_lines_and_quoted_keys() {
        let content = "{\"username\":\"bob\",\"password\":\"x\"}\nnot json at all \"username\": \"carol\"\n";
        let mut store = IdentityStore::new();
        assert_eq!(store.ingest("broken.json", content), 2);

        let bob = store.records_for("bob");
        assert_eq!(bob[0].origin, RecordOrigin::Parsed);
        assert_eq!(bob[0].text_field("password").as_deref(), Some("x"));

        let carol = store.records_for("carol");
        assert_eq!(carol.len(), 1);
        assert_eq!(carol[0].origin, RecordOrigin::Recovered);
        assert_eq!(
            carol[0].text_field("partial").as_deref(),
            Some("data_recovered")
        );
        assert_eq!(carol[0].fields.len(), 1);

        let stats = store.parse_stats();
        assert_eq!(stats.malformed_sources, 1);
        assert_eq!(stats.parsed, 1);
        assert_eq!(stats.recovered, 1);
    }

    #[test]
    fn salvage_is_positional_and_lossy() {
        assert_eq!(salvage_identity(r#"{"email": "e@x", oops"#).as_deref(), Some("e@x"));
        // an unquoted value is skipped over; the next quoted token is taken
        assert_eq!(salvage_identity(r#""name":42, "x"#).as_deref(), Some("x"));
        assert_eq!(salvage_identity(r#""user""#), None);
        assert_eq!(salvage_identity("name: nobody"), None);
    }

    #[test]
    fn unparseable_lines_without_keys_are_counted() {
        let mut store = IdentityStore::new();
        assert_eq!(store.ingest("junk.json", "[{\nnope\n42\n"), 0);
        let stats = store.parse_stats();
        assert_eq!(stats.unrecoverable_lines, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn unknown_identity_is_empty() {
        let store = IdentityStore::new();
        assert!(store.records_for("ghost").is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_source_only_skips_that_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.json"), r#"[{"username": "neo"}]"#).unwrap();
        // opens fine, every read fails with EIO
        let bad = dir.path().join("bad.json");
        std::os::unix::fs::symlink("/proc/self/mem", &bad).unwrap();

        let mut store = IdentityStore::new();
        assert!(matches!(
            store.ingest_file(&bad),
            Err(IngestError::Unreadable { .. })
        ));
        assert_eq!(store.ingest_dir(dir.path()), 1);
        assert_eq!(store.records_for("NEO").len(), 1);
        assert_eq!(store.parse_stats().sources, 1);

        let mut par = IdentityStore::new();
        assert_eq!(par.ingest_dir_parallel(dir.path()), 1);
        assert_eq!(par.records_for("neo").len(), 1);
        assert_eq!(par.parse_stats().sources, 1);
    }
}
