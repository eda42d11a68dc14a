use std::fs;
use std::io::Write;

use leakmatch::classify::{DigestTag, classify};
use leakmatch::config::FinderConfig;
use leakmatch::crack::CrackEngine;
use leakmatch::dictionary::{DictionaryStore, MemorySource};
use leakmatch::identity::{IdentityStore, RecordOrigin};
use leakmatch::search::Finder;
use tempfile::tempdir;

fn common() -> MemorySource {
    MemorySource::new().with_list("common.txt", ["123456", "password", "hunter2"])
}

#[test]
fn sha256_of_hunter2_is_recovered_from_common() {
    let engine = CrackEngine::new(DictionaryStore::new(common()));
    let h = DigestTag::Sha256.hex_digest("hunter2", "").unwrap();
    assert_eq!(classify(&h), DigestTag::Sha256);
    let hit = engine.crack_with_all_dictionaries(&h, "").unwrap();
    assert_eq!(hit.plaintext, "hunter2");
    assert_eq!(hit.wordlist, "common.txt");
}

#[test]
fn earlier_wordlist_wins_sequential_and_parallel() {
    let source = || {
        MemorySource::new()
            .with_list("a.txt", ["x", "y", "hunter2"])
            .with_list("b.txt", ["hunter2"])
    };
    let h = DigestTag::Md5.hex_digest("hunter2", "").unwrap();

    let seq = CrackEngine::new(DictionaryStore::new(source()));
    assert_eq!(seq.crack_with_all_dictionaries(&h, "").unwrap().wordlist, "a.txt");
    // sequential scan stops after the first hit
    assert!(!seq.dictionaries().is_loaded("b.txt"));

    for _ in 0..20 {
        let par = CrackEngine::new(DictionaryStore::new(source()));
        let hit = par.crack_with_all_dictionaries_parallel(&h, "").unwrap();
        assert_eq!(hit.wordlist, "a.txt");
        assert_eq!(hit.plaintext, "hunter2");
    }
}

#[test]
fn absent_plaintext_is_never_a_false_positive() {
    let engine = CrackEngine::new(DictionaryStore::new(common()));
    for tag in [DigestTag::Md5, DigestTag::Sha1, DigestTag::Sha256, DigestTag::Sha512] {
        let h = tag.hex_digest("correct horse", "").unwrap();
        assert_eq!(engine.crack_with_all_dictionaries(&h, ""), None);
        assert_eq!(engine.crack_with_all_dictionaries_parallel(&h, ""), None);
    }
}

#[test]
fn negative_cache_survives_repeat_calls() {
    let engine = CrackEngine::new(DictionaryStore::new(common()));
    let h = DigestTag::Sha512.hex_digest("nope", "salt").unwrap();
    assert_eq!(engine.crack_with_dictionary(&h, "salt", "common.txt"), None);
    let scans = engine.scan_count();
    for _ in 0..3 {
        assert_eq!(engine.crack_with_dictionary(&h, "salt", "common.txt"), None);
    }
    assert_eq!(engine.scan_count(), scans);
    // a different salt is a different key
    assert_eq!(engine.crack_with_dictionary(&h, "", "common.txt"), None);
    assert_eq!(engine.scan_count(), scans + 1);
}

#[test]
fn malformed_file_recovers_full_and_partial_records() {
    let mut store = IdentityStore::new();
    let content = "{\"username\":\"bob\",\"password\":\"x\"}\nnot json at all \"username\": \"carol\"\n";
    assert_eq!(store.ingest("leak.json", content), 2);
    assert_eq!(store.records_for("bob")[0].origin, RecordOrigin::Parsed);
    assert_eq!(store.records_for("carol")[0].origin, RecordOrigin::Recovered);
}

#[test]
fn reingesting_the_same_source_doubles_records() {
    let mut store = IdentityStore::new();
    let content = r#"[{"email": "Alice@Example.com"}, {"user": "alice@example.com"}]"#;
    store.ingest("x.json", content);
    store.ingest("x.json", content);
    assert_eq!(store.records_for("ALICE@example.COM").len(), 4);
}

#[test]
fn search_copies_do_not_leak_into_the_index() {
    let h = DigestTag::Sha1.hex_digest("password", "").unwrap();
    let mut store = IdentityStore::new();
    store.ingest("db.json", &format!(r#"[{{"name": "Alice", "pass": "{h}"}}]"#));
    let finder = Finder::new(store, CrackEngine::new(DictionaryStore::new(common())));

    let cracked = finder.search("alice", false, true);
    assert_eq!(cracked.records[0].cracked_password.as_deref(), Some("password"));
    assert!(finder.identities().records_for("alice")[0].cracked_password.is_none());

    let plain = finder.search("ALICE", false, false);
    assert!(plain.records[0].cracked_password.is_none());
    assert!(plain.records[0].wordlist_used.is_none());
}

#[test]
fn finder_from_directories() {
    let tmp = tempdir().unwrap();
    let data = tmp.path().join("data");
    let words = tmp.path().join("wordlists");
    fs::create_dir_all(&data).unwrap();
    fs::create_dir_all(&words).unwrap();

    let md5 = DigestTag::Md5.hex_digest("hunter2", "").unwrap();
    fs::write(
        data.join("forum.json"),
        format!(r#"[{{"username": "Zed", "password": "{md5}"}}]"#),
    )
    .unwrap();
    fs::write(data.join("shop.json"), r#"{"zed": {"email": "z@x"}, "amy": "vip"}"#).unwrap();
    fs::write(data.join("notes.txt"), r#"[{"username": "zed"}]"#).unwrap();
    {
        let mut f = fs::File::create(words.join("common.txt")).unwrap();
        f.write_all(b"123456\r\npass\xffword\nhunter2\n").unwrap();
    }

    for parallel in [false, true] {
        let config = FinderConfig {
            data_dir: data.clone(),
            wordlists_dir: words.clone(),
            mmap_threshold_bytes: if parallel { 1 } else { u64::MAX },
            parallel_crack: parallel,
            parallel_ingest: parallel,
        };
        let finder = Finder::from_config(&config);
        assert_eq!(finder.identities().identity_count(), 2);
        let result = finder.search("ZED", false, true);
        assert_eq!(result.records.len(), 2);
        let cracked: Vec<_> = result.cracked().collect();
        assert_eq!(cracked.len(), 1);
        assert_eq!(cracked[0].source, "forum.json");
        assert_eq!(cracked[0].cracked_password.as_deref(), Some("hunter2"));
        assert_eq!(cracked[0].wordlist_used.as_deref(), Some("common.txt"));
    }
}

#[test]
fn missing_directories_degrade_to_empty_results() {
    let tmp = tempdir().unwrap();
    let config = FinderConfig {
        data_dir: tmp.path().join("no-data"),
        wordlists_dir: tmp.path().join("no-words"),
        ..FinderConfig::default()
    };
    let finder = Finder::from_config(&config);
    let result = finder.search("anyone", true, true);
    assert!(result.records.is_empty());
    let premium = result.premium_info.unwrap();
    assert!(!premium.is_premium);
    assert!(premium.error.is_some());
}

#[test]
fn classification_table() {
    let samples = [
        "5f4dcc3b5aa765d61d8327deb882cf99",
        "5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8",
        "$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW",
        "$6$rounds=5000$salt$hash",
        "0123456789abcdef",
        "aGVsbG8=",
        "plaintext",
    ];
    let rendered = samples
        .iter()
        .map(|s| format!("{} -> {}", &s[..s.len().min(12)], classify(s)))
        .collect::<Vec<_>>()
        .join("\n");
    insta::assert_snapshot!(rendered, @r"
    5f4dcc3b5aa7 -> md5
    5baa61e4c9b9 -> sha1
    $2b$12$R9h/c -> bcrypt
    $6$rounds=50 -> sha512-crypt
    0123456789ab -> md5-half
    aGVsbG8= -> base64
    plaintext -> unknown
    ");
}
