//! Human-readable report rendering for terminal output.
//!
//! Produces a colored summary of the identity index followed by one block per
//! searched identity: premium status, each matching record, and any recovered
//! password.
use colored::*;
use serde_json::Value;

use crate::{
    identity::{IdentityStore, RecordOrigin},
    search::SearchResult,
    stats::{index_statistics, search_statistics},
};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn push_lines(out: &mut String, lines: Vec<String>) {
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Index overview: totals and records per source, capped at `top_n` sources.
pub fn render_index_summary(store: &IdentityStore, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        "LeakMatch: Identity Correlation Results".bold().cyan()
    ));

    let stats = index_statistics(store);
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("Identities: {}", stats.identity_count));
    lines.push(format!("Records: {}", stats.record_count));
    lines.push(format!("Recovered Records: {}", stats.recovered_count));
    lines.push(format!("Recovered Percentage: {}", stats.recovered_percentage));
    let parse = store.parse_stats();
    lines.push(format!("Sources Read: {}", parse.sources));
    lines.push(format!("Malformed Sources: {}", parse.malformed_sources));
    out.push_str(&section_header(&"Index Statistics".bold().yellow().to_string()));
    push_lines(&mut out, lines);

    let mut source_lines: Vec<String> = Vec::new();
    if stats.per_source.is_empty() {
        source_lines.push("(No sources loaded)".to_string());
    } else {
        for (source, count) in stats.per_source.iter().take(top_n) {
            source_lines.push(format!("  {}: {}", source, count));
        }
    }
    out.push_str(&section_header(&"Records per Source".bold().magenta().to_string()));
    push_lines(&mut out, source_lines);
    out
}

/// One block per search result, followed by batch totals.
pub fn render_search_results(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for result in results {
        let title = format!("Results for {}", result.identity).bold().cyan().to_string();
        out.push_str(&section_header(&title));
        let mut lines: Vec<String> = Vec::new();

        if let Some(premium) = &result.premium_info {
            if premium.is_premium {
                lines.push(format!("{}", "Premium account".bold().green()));
                if let Some(uuid) = &premium.uuid {
                    lines.push(format!("  UUID: {}", uuid));
                }
            } else {
                lines.push(format!("{}", "Not a premium account".dimmed()));
            }
            if let Some(err) = &premium.error {
                lines.push(format!("  Error: {}", err));
            }
        }

        if result.records.is_empty() {
            lines.push("(No records found)".to_string());
        }
        for record in &result.records {
            let origin = match record.origin {
                RecordOrigin::Parsed => String::new(),
                RecordOrigin::Recovered => format!(" {}", "(partially recovered)".yellow()),
            };
            lines.push(format!("{}{}", record.source.bold().blue(), origin));
            for (key, value) in &record.fields {
                lines.push(format!("  {}: {}", key, display_value(value)));
            }
            if let (Some(pw), Some(wordlist)) = (&record.cracked_password, &record.wordlist_used) {
                lines.push(format!(
                    "  {} {} (using {})",
                    "Cracked:".bold(),
                    pw.red(),
                    wordlist
                ));
            }
        }
        push_lines(&mut out, lines);
    }

    let totals = search_statistics(results);
    out.push_str(&section_header(&"Search Totals".bold().yellow().to_string()));
    push_lines(
        &mut out,
        vec![
            format!("Identities Searched: {}", totals.searched),
            format!("Identities Matched: {}", totals.matched),
            format!("Records: {}", totals.records),
            format!("Cracked: {}", totals.cracked),
            format!("Cracked Percentage: {}", totals.cracked_percentage),
        ],
    );
    out
}
