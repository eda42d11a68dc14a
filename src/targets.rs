/// Identities to look up, one per line. Blank lines and `#` comments are
/// ignored; duplicates (case-insensitive) keep their first occurrence.
pub fn parse_identities(contents: &str) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	contents
		.lines()
		.map(|l| l.trim())
		.filter(|l| !l.is_empty() && !l.starts_with('#'))
		.filter(|l| seen.insert(l.to_lowercase()))
		.map(|l| l.to_string())
		.collect()
}
