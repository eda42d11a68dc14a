//! Export helpers for writing search results to JSON and CSV files.
//!
//! - `save_results_json` writes every search result, annotations included.
//! - `save_cracked_csv` writes one row per record with a recovered password,
//!   naming the field the hash was read from.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use csv::Writer;

use crate::search::{SearchResult, crack_field};

pub fn save_results_json<P: AsRef<Path>>(results: &[SearchResult], path: P) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, results)?;
    writeln!(w)?;
    w.flush()?;
    Ok(())
}

pub fn save_cracked_csv<P: AsRef<Path>>(results: &[SearchResult], path: P) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["identity", "source", "field", "cracked_password", "wordlist"])?;
    for result in results {
        for record in result.cracked() {
            wtr.write_record([
                result.identity.as_str(),
                record.source.as_str(),
                crack_field(record).unwrap_or_default(),
                record.cracked_password.as_deref().unwrap_or_default(),
                record.wordlist_used.as_deref().unwrap_or_default(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DigestTag;
    use crate::crack::CrackEngine;
    use crate::dictionary::{DictionaryStore, MemorySource};
    use crate::identity::IdentityStore;
    use crate::search::Finder;
    use tempfile::tempdir;

    #[test]
    fn writes_json_and_csv() {
        let h = DigestTag::Sha256.hex_digest("pw", "").unwrap();
        let mut store = IdentityStore::new();
        store.ingest(
            "db.json",
            &format!(r#"[{{"user": "A", "password": "{h}"}}, {{"user": "a", "note": "x"}}]"#),
        );
        let finder = Finder::new(
            store,
            CrackEngine::new(DictionaryStore::new(
                MemorySource::new().with_list("w.txt", ["pw"]),
            )),
        );
        let results = vec![finder.search("a", false, true)];

        let dir = tempdir().unwrap();
        let json_path = dir.path().join("results.json");
        let csv_path = dir.path().join("cracked.csv");
        save_results_json(&results, &json_path).unwrap();
        save_cracked_csv(&results, &csv_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        let records = json[0]["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["cracked_password"], "pw");
        assert!(records[1].get("cracked_password").is_none());

        let csv_content = std::fs::read_to_string(csv_path).unwrap();
        assert!(csv_content.starts_with("identity,source,field,cracked_password,wordlist\n"));
        assert!(csv_content.contains("a,db.json,password,pw,w.txt"));
        assert_eq!(csv_content.lines().count(), 2);
    }
}
