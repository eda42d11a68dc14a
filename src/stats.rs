//! Summary figures over the identity index and search results.
use std::collections::HashMap;

use crate::identity::{IdentityStore, RecordOrigin};
use crate::search::SearchResult;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub identity_count: usize,
    pub record_count: usize,
    pub recovered_count: usize,
    pub recovered_percentage: String,
    /// `(source, records)` sorted by count desc, then name asc.
    pub per_source: Vec<(String, usize)>,
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

pub fn index_statistics(store: &IdentityStore) -> IndexStats {
    use std::cmp::Reverse;
    let mut by_source: HashMap<String, usize> = HashMap::new();
    let mut records = 0;
    let mut recovered = 0;
    for (_, recs) in store.iter() {
        for r in recs {
            records += 1;
            if r.origin == RecordOrigin::Recovered {
                recovered += 1;
            }
            *by_source.entry(r.source.clone()).or_insert(0) += 1;
        }
    }
    let mut per_source: Vec<(String, usize)> = by_source.into_iter().collect();
    per_source.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    IndexStats {
        identity_count: store.identity_count(),
        record_count: records,
        recovered_count: recovered,
        recovered_percentage: pct(recovered, records),
        per_source,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchStats {
    pub searched: usize,
    pub matched: usize,
    pub records: usize,
    pub cracked: usize,
    pub cracked_percentage: String,
}

/// Totals over a batch of searches. `matched` counts identities with at least
/// one record.
pub fn search_statistics(results: &[SearchResult]) -> SearchStats {
    let records: usize = results.iter().map(|r| r.records.len()).sum();
    let cracked: usize = results.iter().map(|r| r.cracked().count()).sum();
    SearchStats {
        searched: results.len(),
        matched: results.iter().filter(|r| !r.records.is_empty()).count(),
        records,
        cracked,
        cracked_percentage: pct(cracked, records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_source_counts_are_sorted() {
        let mut store = IdentityStore::new();
        store.ingest("b.json", r#"[{"user": "x"}, {"user": "y"}]"#);
        store.ingest("a.json", r#"[{"user": "x"}]"#);
        store.ingest("c.json", "{\"user\": \"z\"}\nbroken \"user\": \"w\"");
        let s = index_statistics(&store);
        assert_eq!(s.identity_count, 4);
        assert_eq!(s.record_count, 5);
        assert_eq!(s.recovered_count, 1);
        assert_eq!(s.recovered_percentage, "20.00%");
        assert_eq!(
            s.per_source,
            vec![
                ("b.json".to_string(), 2),
                ("c.json".to_string(), 2),
                ("a.json".to_string(), 1)
            ]
        );
    }

    #[test]
    fn empty_inputs_do_not_divide_by_zero() {
        assert_eq!(index_statistics(&IdentityStore::new()).recovered_percentage, "0.00%");
        assert_eq!(search_statistics(&[]).cracked_percentage, "0.00%");
    }
}
