use harvest_core::Target;
use sha2::{Digest, Sha256};

/// Portable, deterministic record file name:
/// `{sanitized entity id}--{short_hash(entity id + site)}.jsonl`.
pub fn record_filename(target: &Target) -> String {
    let sanitized = sanitize_stem(&target.entity_id);
    let hash = short_hash(&format!("{}\n{}", target.entity_id, target.site_url));
    format!("{sanitized}--{hash}.jsonl")
}

fn sanitize_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if compacted.is_empty() {
        compacted.push_str("target");
    }
    if compacted.chars().count() > 80 {
        compacted = compacted.chars().take(80).collect();
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::Window;

    fn target(entity: &str, site: &str) -> Target {
        Target::new(entity, site, Window::calendar_year(2020).unwrap())
    }

    #[test]
    fn unsafe_characters_are_replaced_and_collapsed() {
        let name = record_filename(&target("Doe, Jane: TX/07 ", "http://janedoe.com"));
        assert!(name.starts_with("Doe, Jane_ TX_07--"), "{name}");
        assert!(name.ends_with(".jsonl"));
    }

    #[test]
    fn same_entity_on_different_sites_gets_distinct_files() {
        let a = record_filename(&target("H0CA12", "http://a.com"));
        let b = record_filename(&target("H0CA12", "http://b.com"));
        assert_ne!(a, b);
        assert_eq!(a, record_filename(&target("H0CA12", "http://a.com")));
    }

    #[test]
    fn reserved_and_empty_names_stay_usable() {
        assert!(record_filename(&target("CON", "x")).starts_with("CON_--"));
        assert!(record_filename(&target("///", "x")).starts_with("target--"));
    }
}
